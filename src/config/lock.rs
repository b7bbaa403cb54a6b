use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_SESSION_TTL_SECS;
use crate::Error;
use crate::Result;

/// Distributed lock parameters
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LockConfig {
    /// TTL of the session backing each mutex, in seconds.
    /// Bounds how long a crashed lock holder blocks other clients.
    /// Default: 60
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: i64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

impl LockConfig {
    pub fn validate(&self) -> Result<()> {
        if self.session_ttl_secs <= 0 {
            return Err(Error::Config(ConfigError::Message(format!(
                "lock.session_ttl_secs must be greater than 0, got {}",
                self.session_ttl_secs
            ))));
        }
        Ok(())
    }
}

fn default_session_ttl_secs() -> i64 {
    DEFAULT_SESSION_TTL_SECS
}
