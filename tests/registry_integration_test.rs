//! End-to-end scenarios over the in-memory store, using only the public API.

use std::sync::Arc;
use std::time::Duration;

use d_registry::get_values;
use d_registry::BackoffPolicy;
use d_registry::CoordinationStore;
use d_registry::DistributedMutex;
use d_registry::EndpointDirectory;
use d_registry::Error;
use d_registry::LockError;
use d_registry::MemStore;
use d_registry::MutexOptions;
use d_registry::RegistrySettings;
use d_registry::ServiceInfo;
use d_registry::ServiceRegistry;
use d_registry::WatchConfig;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn settings() -> RegistrySettings {
    RegistrySettings {
        watch: WatchConfig {
            reconnect: BackoffPolicy {
                base_delay_ms: 1,
                max_delay_ms: 10,
                jitter_ratio: 0.0,
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

fn registry(store: &MemStore) -> ServiceRegistry {
    let shared: Arc<dyn CoordinationStore> = Arc::new(store.clone());
    ServiceRegistry::new(shared, settings(), &prometheus::Registry::new()).unwrap()
}

/// Receives snapshots until one satisfies `condition`
async fn wait_for_directory<F>(
    rx: &mut mpsc::Receiver<EndpointDirectory>,
    condition: F,
) -> EndpointDirectory
where
    F: Fn(&EndpointDirectory) -> bool,
{
    timeout(Duration::from_secs(2), async {
        loop {
            let directory = rx.recv().await.expect("directory stream ended");
            if condition(&directory) {
                return directory;
            }
        }
    })
    .await
    .expect("expected directory never arrived")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn provider_lifecycle_is_visible_to_consumers() {
    let store = MemStore::new();
    let provider = registry(&store);
    let consumer = registry(&store);

    let mut rx = consumer.watch_services("order", "grpc").await.unwrap();
    let initial = rx.recv().await.unwrap();
    assert!(initial.is_empty());

    let a = ServiceInfo::new("order", "grpc", "10.0.0.1:8080");
    let b = ServiceInfo::new("order", "grpc", "10.0.0.2:8080");
    provider.register_service(&a).await.unwrap();
    provider.register_service(&b).await.unwrap();

    let directory = wait_for_directory(&mut rx, |d| d.nodes.len() == 2).await;
    assert!(directory.nodes.contains_key("grpc://10.0.0.1:8080"));

    provider.close().await;

    wait_for_directory(&mut rx, |d| d.nodes.is_empty()).await;
    assert!(consumer.list_services("order", "grpc").await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watch_survives_compaction_and_disconnects() {
    let store = MemStore::new();
    let provider = registry(&store);
    let consumer = registry(&store);

    let mut rx = consumer.watch_services("order", "grpc").await.unwrap();
    rx.recv().await.unwrap();

    provider
        .register_service(&ServiceInfo::new("order", "grpc", "10.0.0.1:8080"))
        .await
        .unwrap();
    wait_for_directory(&mut rx, |d| d.nodes.len() == 1).await;

    store.sever_watches();
    store.compact(store.revision()).unwrap();

    provider
        .register_service(&ServiceInfo::new("order", "grpc", "10.0.0.2:8080"))
        .await
        .unwrap();
    wait_for_directory(&mut rx, |d| d.nodes.len() == 2).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn only_one_mutex_holds_the_lock() {
    let store = MemStore::new();
    let shared: Arc<dyn CoordinationStore> = Arc::new(store.clone());

    let mut first = DistributedMutex::new(shared.clone(), "/locks/migrate", MutexOptions::default())
        .await
        .unwrap();
    let mut second = DistributedMutex::new(shared.clone(), "/locks/migrate", MutexOptions::default())
        .await
        .unwrap();

    first.lock(Duration::from_secs(1)).await.unwrap();
    let err = second.lock(Duration::from_millis(100)).await.unwrap_err();
    assert!(matches!(err, Error::Lock(LockError::Timeout { .. })));

    first.unlock(Duration::from_secs(1)).await.unwrap();
    second.lock(Duration::from_secs(1)).await.unwrap();
    assert!(second.is_locked());
    second.unlock(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn multi_get_spans_several_transactions() {
    let store = MemStore::new();
    let keys: Vec<String> = (0..300).map(|i| format!("/cfg/key-{i:03}")).collect();
    for key in &keys {
        store.put(key.as_bytes(), key.as_bytes(), None).await.unwrap();
    }

    let values = get_values(&store, &keys, 128).await.unwrap();

    assert_eq!(values.len(), 300);
    assert_eq!(values["/cfg/key-299"], "/cfg/key-299");
}
