use std::time::Duration;

use config::ConfigError;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Exponential backoff template for reconnect loops
///
/// Delays grow as `base_delay_ms * 2^attempt`, capped at `max_delay_ms`,
/// with up to `jitter_ratio` of random spread so that many clients losing
/// the same store node do not reconnect in lockstep.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Backoff base (unit: milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Random spread applied to every delay, in `[0.0, 1.0]`
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ratio: default_jitter_ratio(),
        }
    }
}

impl BackoffPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.base_delay_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "backoff base_delay_ms must be greater than 0".to_string(),
            )));
        }

        if self.max_delay_ms < self.base_delay_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "backoff max_delay_ms ({}) must be >= base_delay_ms ({})",
                self.max_delay_ms, self.base_delay_ms
            ))));
        }

        if !(0.0..=1.0).contains(&self.jitter_ratio) {
            return Err(Error::Config(ConfigError::Message(format!(
                "backoff jitter_ratio must be between 0.0 and 1.0, got {}",
                self.jitter_ratio
            ))));
        }

        Ok(())
    }

    /// Delay before retry number `attempt` (0-based), jitter included
    pub fn delay(
        &self,
        attempt: u32,
    ) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX));
        let capped = exp.min(self.max_delay_ms);

        let spread = (capped as f64 * self.jitter_ratio) as u64;
        let jitter = if spread > 0 {
            rand::thread_rng().gen_range(0..=spread)
        } else {
            0
        };

        Duration::from_millis(capped.saturating_sub(spread / 2).saturating_add(jitter))
    }
}

fn default_base_delay_ms() -> u64 {
    100
}
fn default_max_delay_ms() -> u64 {
    5000
}
fn default_jitter_ratio() -> f64 {
    0.2
}
