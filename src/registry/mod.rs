//! Service registration and discovery.
//!
//! [`ServiceRegistry`] writes instance descriptors under a fixed key layout,
//! ties them to per-key lease sessions, reads them back in one consistent
//! read and streams [`crate::EndpointDirectory`] snapshots to watchers.
//!
//! # Key layout
//!
//! ```text
//! /{prefix}/{service}/providers/{scheme}://{host}:{port}[?params]
//! /{prefix}/{service}/configurators/{scheme}://{routes|providers|consumers}/{id}
//! /prometheus/job/{service}/{address}
//! ```

pub mod keys;
mod service;
mod service_registry;
pub use service::*;
pub use service_registry::*;
