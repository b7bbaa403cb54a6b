//! Configuration management module for the coordination client.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Environment variable overrides
//! - Configuration file support
//! - Component-wise validation
mod lock;
mod registry;
mod retry;
mod store;
mod watch;
pub use lock::*;
pub use registry::*;
pub use retry::*;
pub use store::*;
pub use watch::*;

#[cfg(test)]
mod config_test;

use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Environment variable naming an optional settings file
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Prefix of environment variable overrides, e.g. `REGISTRY__REGISTRY__PREFIX`
pub const ENV_PREFIX: &str = "REGISTRY";

/// Main configuration container for the coordination client components
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct RegistrySettings {
    /// Coordination store endpoints and request bounds
    #[serde(default)]
    pub store: StoreConfig,
    /// Key layout and registration lifecycle
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Watch buffering and reconnect policy
    #[serde(default)]
    pub watch: WatchConfig,
    /// Distributed lock sessions
    #[serde(default)]
    pub lock: LockConfig,
}

impl Debug for RegistrySettings {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("RegistrySettings")
            .field("store", &self.store)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl RegistrySettings {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `REGISTRY__` prefix (highest priority)
    ///
    /// # Note
    /// Validation is deferred so further overrides can be applied with
    /// [`with_override_config`](Self::with_override_config). Callers MUST call
    /// [`validate`](Self::validate) before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("REGISTRY__STORE__ENDPOINTS", "http://127.0.0.1:2379");
    /// let settings = RegistrySettings::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(Self::environment());

        let settings: Self = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let settings: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Validates configuration and returns validated instance.
    ///
    /// # Errors
    /// Configuration errors are fatal at startup: they describe a misconfigured
    /// deployment, not a runtime condition.
    /// - Empty store endpoint list
    /// - Empty registry prefix
    /// - Zero-capacity channels
    /// - Inconsistent backoff bounds
    pub fn validate(self) -> Result<Self> {
        self.store.validate()?;
        self.registry.validate()?;
        self.watch.validate()?;
        self.lock.validate()?;
        Ok(self)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .ignore_empty(true)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("store.endpoints")
    }
}
