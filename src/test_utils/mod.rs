//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::BackoffPolicy;
use crate::CoordinationStore;
use crate::Event;
use crate::EventType;
use crate::KeyValue;
use crate::MemStore;
use crate::RegistryMetrics;
use crate::Revision;
use crate::WatchConfig;

/// Collectors not exposed through any registry
pub(crate) fn test_metrics() -> Arc<RegistryMetrics> {
    Arc::new(RegistryMetrics::unregistered().expect("metrics should build"))
}

/// Watch settings with millisecond reconnect delays
pub(crate) fn fast_watch_config() -> WatchConfig {
    WatchConfig {
        reconnect: BackoffPolicy {
            base_delay_ms: 1,
            max_delay_ms: 10,
            jitter_ratio: 0.0,
        },
        ..Default::default()
    }
}

/// A MemStore plus the same store behind the capability trait
pub(crate) fn mem_store() -> (MemStore, Arc<dyn CoordinationStore>) {
    let store = MemStore::new();
    let shared: Arc<dyn CoordinationStore> = Arc::new(store.clone());
    (store, shared)
}

pub(crate) fn kv(
    key: &str,
    value: &str,
    mod_revision: Revision,
) -> KeyValue {
    KeyValue {
        key: Bytes::copy_from_slice(key.as_bytes()),
        value: Bytes::copy_from_slice(value.as_bytes()),
        create_revision: mod_revision,
        mod_revision,
        lease: 0,
    }
}

pub(crate) fn put_event(
    key: &str,
    value: &str,
    mod_revision: Revision,
) -> Event {
    Event {
        event_type: EventType::Put,
        kv: kv(key, value, mod_revision),
    }
}

pub(crate) fn delete_event(
    key: &str,
    mod_revision: Revision,
) -> Event {
    Event {
        event_type: EventType::Delete,
        kv: KeyValue {
            create_revision: 0,
            ..kv(key, "", mod_revision)
        },
    }
}

/// Polls `condition` every 5ms until it holds or `limit` elapses
pub(crate) async fn wait_until<F>(
    limit: Duration,
    condition: F,
) -> bool
where
    F: Fn() -> bool,
{
    tokio::time::timeout(limit, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}
