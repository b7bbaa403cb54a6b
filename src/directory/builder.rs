use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::ConfigCategory;
use super::ConfigLocation;
use super::ConsumerConfig;
use super::EndpointDirectory;
use super::ProviderConfig;
use super::RouteConfig;
use crate::constants::CONFIGURATORS_SEGMENT;
use crate::constants::PROVIDERS_SEGMENT;
use crate::metrics::DECODE_SOURCE_DIRECTORY;
use crate::Event;
use crate::KeyValue;
use crate::RegistryMetrics;
use crate::ServiceInfo;
use crate::WatchGuard;

/// What a key under the watched prefix refers to
#[derive(Debug, PartialEq, Eq)]
enum KeyKind<'a> {
    /// `{scheme}://{address}` of an instance
    Node(&'a str),
    /// `{scheme}://…` of a configuration object
    Config(&'a str),
    /// `host:port` without scheme or category
    BareAddress(&'a str),
    Other,
}

/// Maintains an [`EndpointDirectory`] from watch events
pub struct DirectoryBuilder {
    prefix: String,
    scheme: String,
    directory: EndpointDirectory,
    metrics: Arc<RegistryMetrics>,
}

impl std::fmt::Debug for DirectoryBuilder {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DirectoryBuilder")
            .field("prefix", &self.prefix)
            .field("scheme", &self.scheme)
            .field("entries", &self.directory.len())
            .finish()
    }
}

impl DirectoryBuilder {
    /// `prefix` is the watched prefix ending with `/`; only keys of `scheme` are kept
    pub fn new(
        prefix: impl Into<String>,
        scheme: impl Into<String>,
        metrics: Arc<RegistryMetrics>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            scheme: scheme.into(),
            directory: EndpointDirectory::new(),
            metrics,
        }
    }

    pub fn directory(&self) -> &EndpointDirectory {
        &self.directory
    }

    /// Deep copy of the current directory
    pub fn snapshot(&self) -> EndpointDirectory {
        self.directory.clone_directory()
    }

    /// Loads the initial key set
    pub fn apply_snapshot(
        &mut self,
        kvs: &[KeyValue],
    ) {
        for kv in kvs {
            self.apply_put(kv);
        }
        debug!(
            prefix = %self.prefix,
            keys = kvs.len(),
            entries = self.directory.len(),
            "Directory snapshot applied"
        );
    }

    /// Applies one change; returns whether the directory changed
    pub fn apply_event(
        &mut self,
        event: &Event,
    ) -> bool {
        if event.is_put() {
            self.apply_put(&event.kv)
        } else {
            self.apply_delete(&event.kv.key_str())
        }
    }

    /// Publishes the incipient directory, then one snapshot per applied
    /// event, until the event stream ends or `out` is dropped.
    ///
    /// Dropping `guard` at the end closes the underlying watch.
    pub async fn run(
        mut self,
        incipient: Vec<KeyValue>,
        mut events: mpsc::Receiver<Event>,
        out: mpsc::Sender<EndpointDirectory>,
        guard: WatchGuard,
    ) {
        self.apply_snapshot(&incipient);
        if !self.publish(&out) {
            return;
        }

        loop {
            let event = tokio::select! {
                _ = out.closed() => break,
                event = events.recv() => event,
            };
            let Some(event) = event else {
                break;
            };
            if self.apply_event(&event) && !self.publish(&out) {
                break;
            }
        }

        debug!(prefix = %self.prefix, "Directory builder stopped");
        drop(guard);
    }

    /// Returns `false` once the subscriber is gone
    fn publish(
        &self,
        out: &mpsc::Sender<EndpointDirectory>,
    ) -> bool {
        match out.try_send(self.snapshot()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.metrics
                    .directory_snapshots_dropped
                    .with_label_values(&[&self.prefix])
                    .inc();
                warn!(prefix = %self.prefix, "Directory subscriber is lagging, dropping snapshot");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    fn classify<'a>(
        &self,
        key: &'a str,
    ) -> KeyKind<'a> {
        let Some(rest) = key.strip_prefix(self.prefix.as_str()) else {
            return KeyKind::Other;
        };
        let scheme_prefix = format!("{}://", self.scheme);

        if let Some(uri) = strip_segment(rest, PROVIDERS_SEGMENT) {
            if uri.starts_with(&scheme_prefix) {
                return KeyKind::Node(uri);
            }
            if is_bare_address(uri) {
                return KeyKind::BareAddress(uri);
            }
            return KeyKind::Other;
        }
        if let Some(uri) = strip_segment(rest, CONFIGURATORS_SEGMENT) {
            if uri.starts_with(&scheme_prefix) {
                return KeyKind::Config(uri);
            }
            return KeyKind::Other;
        }
        if is_bare_address(rest) {
            return KeyKind::BareAddress(rest);
        }
        KeyKind::Other
    }

    fn apply_put(
        &mut self,
        kv: &KeyValue,
    ) -> bool {
        let key = kv.key_str();
        match self.classify(&key) {
            KeyKind::Node(uri) => match parse_node_uri(uri).and_then(|()| {
                serde_json::from_slice::<ServiceInfo>(&kv.value).map_err(|e| e.to_string())
            }) {
                Ok(info) => {
                    trace!(uri, "Node upserted");
                    self.directory.nodes.insert(uri.to_string(), info);
                    true
                }
                Err(reason) => {
                    self.decode_failed(&key, &reason);
                    false
                }
            },
            KeyKind::Config(uri) => match self.decode_config(uri, &kv.value) {
                Ok(()) => true,
                Err(reason) => {
                    self.decode_failed(&key, &reason);
                    false
                }
            },
            KeyKind::BareAddress(_) | KeyKind::Other => {
                debug!(key = %key, "Skipping key outside the directory layout");
                false
            }
        }
    }

    fn apply_delete(
        &mut self,
        key: &str,
    ) -> bool {
        match self.classify(key) {
            KeyKind::Node(uri) => self.directory.nodes.remove(uri).is_some(),
            KeyKind::Config(uri) => {
                let routes = self.directory.route_configs.remove(uri).is_some();
                let providers = self.directory.provider_configs.remove(uri).is_some();
                let consumers = self.directory.consumer_configs.remove(uri).is_some();
                routes || providers || consumers
            }
            KeyKind::BareAddress(address) => {
                let before = self.directory.len();
                self.directory
                    .nodes
                    .retain(|uri, info| node_address(uri) != address && info.address != address);
                self.directory.route_configs.retain(|_, route| route.host != address);
                debug!(address, removed = before - self.directory.len(), "Bare address deleted");
                self.directory.len() != before
            }
            KeyKind::Other => {
                debug!(key, "Skipping key outside the directory layout");
                false
            }
        }
    }

    fn decode_config(
        &mut self,
        uri: &str,
        value: &[u8],
    ) -> std::result::Result<(), String> {
        let location = ConfigLocation::parse(uri)?;
        let scheme = self.scheme.clone();

        match location.category {
            ConfigCategory::Routes => {
                let mut config: RouteConfig = serde_json::from_slice(value).map_err(|e| e.to_string())?;
                config.id = location.id;
                config.scheme = scheme;
                config.host = location.host;
                self.directory.route_configs.insert(uri.to_string(), config);
            }
            ConfigCategory::Providers => {
                let mut config: ProviderConfig = serde_json::from_slice(value).map_err(|e| e.to_string())?;
                config.id = location.id;
                config.scheme = scheme;
                config.host = location.host;
                self.directory.provider_configs.insert(uri.to_string(), config);
            }
            ConfigCategory::Consumers => {
                let mut config: ConsumerConfig = serde_json::from_slice(value).map_err(|e| e.to_string())?;
                config.id = location.id;
                config.scheme = scheme;
                config.host = location.host;
                self.directory.consumer_configs.insert(uri.to_string(), config);
            }
        }
        Ok(())
    }

    fn decode_failed(
        &self,
        key: &str,
        reason: &str,
    ) {
        self.metrics
            .decode_failures
            .with_label_values(&[DECODE_SOURCE_DIRECTORY])
            .inc();
        warn!(key, reason, "Skipping undecodable directory entry");
    }
}

/// `rest` without a leading `{segment}/`
fn strip_segment<'a>(
    rest: &'a str,
    segment: &str,
) -> Option<&'a str> {
    rest.strip_prefix(segment)?.strip_prefix('/')
}

/// Checks that a node key names a `{scheme}://{host}` URI.
///
/// The map keeps the URI exactly as written in the key so a later delete of
/// the same key finds it; parsing would normalize special schemes.
fn parse_node_uri(uri: &str) -> std::result::Result<(), String> {
    let url = url::Url::parse(uri).map_err(|e| format!("invalid node uri {uri}: {e}"))?;
    if url.host_str().unwrap_or_default().is_empty() {
        return Err(format!("node uri {uri} has no host"));
    }
    Ok(())
}

/// `host:port` with no scheme, path or query
fn is_bare_address(s: &str) -> bool {
    if s.contains("://") || s.contains('/') || s.contains('?') {
        return false;
    }
    match s.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}

/// Authority part of a `{scheme}://{address}[?params]` node key
fn node_address(uri: &str) -> &str {
    let rest = uri.split_once("://").map_or(uri, |(_, rest)| rest);
    rest.split(['?', '/']).next().unwrap_or(rest)
}
