// -
// Key layout

/// Default root namespace of service registrations
pub const DEFAULT_REGISTRY_PREFIX: &str = "ego";

/// Key segment holding service instances
pub const PROVIDERS_SEGMENT: &str = "providers";

/// Key segment holding configuration objects
pub const CONFIGURATORS_SEGMENT: &str = "configurators";

/// Namespace of governance (metrics export) registrations
pub const PROMETHEUS_JOB_PREFIX: &str = "/prometheus/job";

/// Separator between key path segments
pub const KEY_SEPARATOR: char = '/';

// -
// Store limits

/// Per-transaction operation ceiling of the coordination store
pub const MAX_TXN_OPS: usize = 128;

/// Lease TTL used when a session is requested without one
pub const DEFAULT_SESSION_TTL_SECS: i64 = 60;

// -
// Channel capacities

/// Live watch event buffer per watch handle
pub const DEFAULT_WATCH_EVENT_BUFFER: usize = 100;

/// Directory snapshot buffer per `watch_services` subscriber
pub const DEFAULT_DIRECTORY_BUFFER: usize = 10;
