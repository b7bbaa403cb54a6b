use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::keys;
use crate::kv;
use crate::metrics::DECODE_SOURCE_LIST;
use crate::ConfigCategory;
use crate::CoordinationStore;
use crate::DirectoryBuilder;
use crate::EndpointDirectory;
use crate::Error;
use crate::GetOptions;
use crate::RegistryMetrics;
use crate::RegistrySettings;
use crate::Result;
use crate::ServiceInfo;
use crate::SessionManager;
use crate::WatchEngine;

/// Registers service instances and serves discovery reads and watches
///
/// # Lifecycle
/// Every key written by [`register_service`](Self::register_service) is
/// tracked until unregistered. [`close`](Self::close) unregisters whatever is
/// left and stops every watch opened through this registry.
pub struct ServiceRegistry {
    store: Arc<dyn CoordinationStore>,
    settings: RegistrySettings,
    sessions: SessionManager,
    registered: DashSet<String>,
    watch_engine: WatchEngine,
    /// Parent of every watch token
    root_token: CancellationToken,
    metrics: Arc<RegistryMetrics>,
    closed: AtomicBool,
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("prefix", &self.settings.registry.prefix)
            .field("registered", &self.registered.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ServiceRegistry {
    /// Validates `settings` and registers the registry's metrics into `metrics_registry`
    ///
    /// # Errors
    /// - [`Error::Config`] when `settings` are invalid
    /// - [`Error::Metrics`] when the metric names are already taken in `metrics_registry`
    pub fn new(
        store: Arc<dyn CoordinationStore>,
        settings: RegistrySettings,
        metrics_registry: &prometheus::Registry,
    ) -> Result<Self> {
        let settings = settings.validate()?;
        let metrics = Arc::new(RegistryMetrics::new(metrics_registry)?);
        let watch_engine = WatchEngine::new(store.clone(), settings.watch.clone(), metrics.clone());

        info!(
            prefix = %settings.registry.prefix,
            service_ttl_secs = settings.registry.service_ttl_secs,
            "Service registry created"
        );

        Ok(Self {
            sessions: SessionManager::new(store.clone()),
            store,
            settings,
            registered: DashSet::new(),
            watch_engine,
            root_token: CancellationToken::new(),
            metrics,
            closed: AtomicBool::new(false),
        })
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub fn metrics(&self) -> &RegistryMetrics {
        &self.metrics
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn prefix(&self) -> &str {
        self.settings.registry.normalized_prefix()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Instance key `info` is registered under
    pub fn service_key(
        &self,
        info: &ServiceInfo,
    ) -> String {
        keys::service_key(self.prefix(), info)
    }

    /// Writes the instance key of `info` (and its metrics job key for
    /// governance services), leased when `service_ttl_secs > 0`.
    ///
    /// # Errors
    /// Store failures are returned as-is, never retried. The call is bounded
    /// by `registry.write_timeout_ms`.
    pub async fn register_service(
        &self,
        info: &ServiceInfo,
    ) -> Result<()> {
        self.ensure_open()?;
        info.validate()?;

        let value = info.encode()?;
        let key = self.service_key(info);
        let write_timeout = self.settings.registry.write_timeout();

        bounded("register_service", write_timeout, async {
            self.put_registered(&key, &value).await?;
            if info.is_governance() {
                let job_key = keys::metrics_job_key(&info.name, &info.address);
                self.put_registered(&job_key, info.address.as_bytes()).await?;
            }
            Ok(())
        })
        .await?;

        info!(key, kind = ?info.kind, "Service registered");
        Ok(())
    }

    async fn put_registered(
        &self,
        key: &str,
        value: &[u8],
    ) -> Result<()> {
        let ttl = self.settings.registry.service_ttl_secs;
        let lease = if ttl > 0 {
            Some(self.sessions.get_or_create(key, ttl).await?.lease_id())
        } else {
            None
        };

        self.store.put(key.as_bytes(), value, lease).await?;
        self.registered.insert(key.to_string());
        self.metrics.registered_keys.set(self.registered.len() as i64);
        debug!(key, ?lease, "Registry key written");
        Ok(())
    }

    /// Removes every key [`register_service`](Self::register_service) wrote for `info`
    pub async fn unregister_service(
        &self,
        info: &ServiceInfo,
    ) -> Result<()> {
        info.validate()?;
        self.unregister(&self.service_key(info)).await?;
        if info.is_governance() {
            self.unregister(&keys::metrics_job_key(&info.name, &info.address))
                .await?;
        }
        Ok(())
    }

    /// Revokes the session of `key`, if any, then deletes `key` regardless
    ///
    /// Deleting a key that is already gone succeeds.
    pub async fn unregister(
        &self,
        key: &str,
    ) -> Result<()> {
        let write_timeout = self.settings.registry.write_timeout();
        bounded("unregister", write_timeout, self.unregister_key(key)).await
    }

    async fn unregister_key(
        &self,
        key: &str,
    ) -> Result<()> {
        if let Err(e) = self.sessions.release(key).await {
            warn!(key, error = %e, "Failed to revoke registration lease, deleting key anyway");
        }
        let deleted = self.store.delete(key.as_bytes(), false).await?;

        self.registered.remove(key);
        self.metrics.registered_keys.set(self.registered.len() as i64);
        info!(key, deleted, "Service unregistered");
        Ok(())
    }

    /// Instances of `name` registered with `scheme`, from one consistent read
    ///
    /// Entries whose value cannot be decoded are skipped with a warning.
    pub async fn list_services(
        &self,
        name: &str,
        scheme: &str,
    ) -> Result<Vec<ServiceInfo>> {
        let prefix = keys::providers_prefix(self.prefix(), name, scheme);
        let read_timeout = self.settings.registry.read_timeout();

        let response = bounded("list_services", read_timeout, async {
            Ok(self.store.get(prefix.as_bytes(), GetOptions::prefix()).await?)
        })
        .await?;

        let services = response
            .kvs
            .iter()
            .filter_map(|kv| {
                let key = kv.key_str();
                match ServiceInfo::decode(&key, &kv.value) {
                    Ok(info) => Some(info),
                    Err(e) => {
                        self.metrics
                            .decode_failures
                            .with_label_values(&[DECODE_SOURCE_LIST])
                            .inc();
                        warn!(error = %e, "Skipping malformed service entry");
                        None
                    }
                }
            })
            .collect();
        Ok(services)
    }

    /// Streams directory snapshots of service `name`, starting with the current state
    ///
    /// The stream ends when the receiver is dropped or the registry is closed.
    pub async fn watch_services(
        &self,
        name: &str,
        scheme: &str,
    ) -> Result<mpsc::Receiver<EndpointDirectory>> {
        self.ensure_open()?;

        let prefix = keys::service_prefix(self.prefix(), name);
        let read_timeout = self.settings.registry.read_timeout();
        let handle = bounded(
            "watch_services",
            read_timeout,
            self.watch_engine
                .watch_prefix_with_token(&prefix, self.root_token.child_token()),
        )
        .await?;

        let (incipient, events, guard) = handle.into_receiver();
        let (tx, rx) = mpsc::channel(self.settings.watch.directory_buffer_size);
        let builder = DirectoryBuilder::new(prefix.clone(), scheme, self.metrics.clone());
        tokio::spawn(builder.run(incipient, events, tx, guard));

        info!(prefix, scheme, "Watching services");
        Ok(rx)
    }

    /// Writes a configuration object under the configurator layout
    pub async fn put_configurator<T: Serialize>(
        &self,
        name: &str,
        scheme: &str,
        category: ConfigCategory,
        id: &str,
        value: &T,
    ) -> Result<()> {
        self.ensure_open()?;
        let key = keys::configurator_key(self.prefix(), name, scheme, category, id);
        let value = serde_json::to_vec(value)?;
        let write_timeout = self.settings.registry.write_timeout();

        bounded("put_configurator", write_timeout, async {
            self.store.put(key.as_bytes(), &value, None).await?;
            Ok(())
        })
        .await?;
        debug!(key, "Configurator written");
        Ok(())
    }

    pub async fn delete_configurator(
        &self,
        name: &str,
        scheme: &str,
        category: ConfigCategory,
        id: &str,
    ) -> Result<()> {
        let key = keys::configurator_key(self.prefix(), name, scheme, category, id);
        let write_timeout = self.settings.registry.write_timeout();

        bounded("delete_configurator", write_timeout, async {
            self.store.delete(key.as_bytes(), false).await?;
            Ok(())
        })
        .await?;
        debug!(key, "Configurator deleted");
        Ok(())
    }

    /// Consistent multi-key read, see [`crate::get_values`]
    pub async fn get_values(
        &self,
        keys: &[String],
    ) -> Result<HashMap<String, String>> {
        let read_timeout = self.settings.registry.read_timeout();
        bounded(
            "get_values",
            read_timeout,
            kv::get_values(
                self.store.as_ref(),
                keys,
                self.settings.registry.max_txn_ops,
            ),
        )
        .await
    }

    /// Keys written by this registry and not yet unregistered, sorted
    pub fn registered_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.registered.iter().map(|k| k.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Unregisters every tracked key concurrently, then stops all watches.
    ///
    /// Best effort: each key gets `registry.shutdown_unregister_timeout_ms`
    /// and failures are logged. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let keys = self.registered_keys();
        let per_key = self.settings.registry.shutdown_unregister_timeout();
        info!(keys = keys.len(), "Closing service registry");

        let results = join_all(
            keys.iter()
                .map(|key| bounded("unregister", per_key, self.unregister_key(key))),
        )
        .await;

        let mut failed = 0usize;
        for (key, result) in keys.iter().zip(results) {
            if let Err(e) = result {
                failed += 1;
                error!(key, error = %e, "Failed to unregister during shutdown");
            }
        }

        self.sessions.close_all().await;
        self.root_token.cancel();
        info!(
            unregistered = keys.len() - failed,
            failed,
            "Service registry closed"
        );
    }
}

impl Drop for ServiceRegistry {
    fn drop(&mut self) {
        self.root_token.cancel();
    }
}

/// Runs `operation` under `timeout`
async fn bounded<T>(
    operation: &'static str,
    timeout: Duration,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| Error::timeout(operation, timeout))?
}
