use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_REGISTRY_PREFIX;
use crate::constants::MAX_TXN_OPS;
use crate::Error;
use crate::Result;

/// Service registration parameters
///
/// # Key layout
/// Instances are written under
/// `/{prefix}/{service}/providers/{scheme}://{address}`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RegistryConfig {
    /// Root namespace of registrations (without slashes)
    /// Default: `ego`
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Lease TTL attached to registrations, in seconds.
    /// `0` writes registrations without a lease (they never self-expire).
    /// Default: 60
    #[serde(default = "default_service_ttl_secs")]
    pub service_ttl_secs: i64,

    /// Bound on register/unregister calls
    /// Default: 3 seconds
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Bound on list/read calls
    /// Default: 3 seconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Per-key bound when draining registrations on shutdown
    /// Default: 1 second
    #[serde(default = "default_shutdown_unregister_timeout_ms")]
    pub shutdown_unregister_timeout_ms: u64,

    /// Per-transaction operation ceiling used by batched reads
    /// Default: 128
    #[serde(default = "default_max_txn_ops")]
    pub max_txn_ops: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            service_ttl_secs: default_service_ttl_secs(),
            write_timeout_ms: default_write_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            shutdown_unregister_timeout_ms: default_shutdown_unregister_timeout_ms(),
            max_txn_ops: default_max_txn_ops(),
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<()> {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "registry.prefix cannot be empty".to_string(),
            )));
        }

        if self.service_ttl_secs < 0 {
            return Err(Error::Config(ConfigError::Message(format!(
                "registry.service_ttl_secs must not be negative, got {}",
                self.service_ttl_secs
            ))));
        }

        if self.write_timeout_ms == 0 || self.read_timeout_ms == 0 || self.shutdown_unregister_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "registry timeouts must be greater than 0".to_string(),
            )));
        }

        if !(1..=MAX_TXN_OPS).contains(&self.max_txn_ops) {
            return Err(Error::Config(ConfigError::Message(format!(
                "registry.max_txn_ops must be between 1 and {MAX_TXN_OPS}, got {}",
                self.max_txn_ops
            ))));
        }

        Ok(())
    }

    /// Prefix with surrounding slashes removed
    pub fn normalized_prefix(&self) -> &str {
        self.prefix.trim_matches('/')
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn shutdown_unregister_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_unregister_timeout_ms)
    }
}

fn default_prefix() -> String {
    DEFAULT_REGISTRY_PREFIX.to_string()
}
fn default_service_ttl_secs() -> i64 {
    60
}
fn default_write_timeout_ms() -> u64 {
    3000
}
fn default_read_timeout_ms() -> u64 {
    3000
}
fn default_shutdown_unregister_timeout_ms() -> u64 {
    1000
}
fn default_max_txn_ops() -> usize {
    MAX_TXN_OPS
}
