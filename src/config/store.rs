use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Coordination store connection parameters
///
/// The store client itself (connection setup, TLS, connection-level retries)
/// is an external collaborator; request deadlines live in [`super::RegistryConfig`].
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StoreConfig {
    /// Store endpoints, e.g. `http://127.0.0.1:2379`
    /// Default: `["http://127.0.0.1:2379"]`
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "store.endpoints must contain at least one endpoint".to_string(),
            )));
        }

        if let Some(blank) = self.endpoints.iter().find(|e| e.trim().is_empty()) {
            return Err(Error::Config(ConfigError::Message(format!(
                "store.endpoints contains a blank entry: {blank:?}"
            ))));
        }

        Ok(())
    }
}

fn default_endpoints() -> Vec<String> {
    vec!["http://127.0.0.1:2379".to_string()]
}
