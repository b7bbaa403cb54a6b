//! Prometheus counters for the coordination client.
//!
//! Collectors are owned by a [`RegistryMetrics`] value and registered into a
//! caller-supplied [`prometheus::Registry`], so several registries (or tests)
//! can live in one process without colliding on global names.

#[cfg(test)]
mod metrics_test;

use prometheus::Encoder;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;

use crate::Result;

/// Label value used for decode failures raised while building a directory
pub const DECODE_SOURCE_DIRECTORY: &str = "directory";
/// Label value used for decode failures raised by `list_services`
pub const DECODE_SOURCE_LIST: &str = "list";

#[derive(Clone, Debug)]
pub struct RegistryMetrics {
    /// Watch events discarded because the handle's buffer was full
    pub watch_events_dropped: IntCounterVec,
    /// Watch stream reopen attempts
    pub watch_reconnects: IntCounterVec,
    /// Directory snapshots discarded because the subscriber's buffer was full
    pub directory_snapshots_dropped: IntCounterVec,
    /// Keys or payloads skipped because they could not be decoded
    pub decode_failures: IntCounterVec,
    /// Keys currently recorded in the registered-key index
    pub registered_keys: IntGauge,
}

impl RegistryMetrics {
    /// Creates the collectors and registers them into `registry`
    ///
    /// # Errors
    /// Fails if collectors with the same names are already registered.
    pub fn new(registry: &Registry) -> Result<Self> {
        let metrics = Self::unregistered()?;

        registry.register(Box::new(metrics.watch_events_dropped.clone()))?;
        registry.register(Box::new(metrics.watch_reconnects.clone()))?;
        registry.register(Box::new(metrics.directory_snapshots_dropped.clone()))?;
        registry.register(Box::new(metrics.decode_failures.clone()))?;
        registry.register(Box::new(metrics.registered_keys.clone()))?;

        Ok(metrics)
    }

    /// Creates collectors without exposing them through any registry
    pub fn unregistered() -> Result<Self> {
        Ok(Self {
            watch_events_dropped: IntCounterVec::new(
                Opts::new(
                    "watch_events_dropped_total",
                    "Watch events dropped because the event buffer was full",
                ),
                &["prefix"],
            )?,
            watch_reconnects: IntCounterVec::new(
                Opts::new("watch_reconnects_total", "Watch stream reopen attempts"),
                &["prefix"],
            )?,
            directory_snapshots_dropped: IntCounterVec::new(
                Opts::new(
                    "directory_snapshots_dropped_total",
                    "Endpoint directory snapshots dropped because the subscriber buffer was full",
                ),
                &["prefix"],
            )?,
            decode_failures: IntCounterVec::new(
                Opts::new(
                    "decode_failures_total",
                    "Registry entries skipped because their key or value could not be decoded",
                ),
                &["source"],
            )?,
            registered_keys: IntGauge::new(
                "registered_keys",
                "Keys written by this process and not yet unregistered",
            )?,
        })
    }
}

/// Renders every metric of `registry` in the Prometheus text format
pub fn encode_text(registry: &Registry) -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
