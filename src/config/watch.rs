use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use super::BackoffPolicy;
use crate::constants::DEFAULT_DIRECTORY_BUFFER;
use crate::constants::DEFAULT_WATCH_EVENT_BUFFER;
use crate::Error;
use crate::Result;

/// Watch engine parameters
///
/// Both buffers follow a drop-newest policy: when a consumer falls behind,
/// new events (or directory snapshots) are discarded with a warning instead
/// of blocking the producer.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WatchConfig {
    /// Live event buffer per watch handle
    /// Default: 100
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,

    /// Directory snapshot buffer per `watch_services` subscriber
    /// Default: 10
    #[serde(default = "default_directory_buffer_size")]
    pub directory_buffer_size: usize,

    /// Delay policy between stream reopen attempts
    #[serde(default)]
    pub reconnect: BackoffPolicy,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: default_event_buffer_size(),
            directory_buffer_size: default_directory_buffer_size(),
            reconnect: BackoffPolicy::default(),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 || self.directory_buffer_size == 0 {
            return Err(Error::Config(ConfigError::Message(format!(
                "watch buffers must be greater than 0 (event_buffer_size: {}, directory_buffer_size: {})",
                self.event_buffer_size, self.directory_buffer_size
            ))));
        }

        self.reconnect.validate()
    }
}

fn default_event_buffer_size() -> usize {
    DEFAULT_WATCH_EVENT_BUFFER
}
fn default_directory_buffer_size() -> usize {
    DEFAULT_DIRECTORY_BUFFER
}
