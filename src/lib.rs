//! Client-side coordination layer over a Raft-backed key/value store.
//!
//! - [`WatchEngine`]: prefix watches that survive disconnects and compaction
//! - [`SessionManager`]: lease sessions kept alive in the background
//! - [`DistributedMutex`]: session-bound exclusive locks
//! - [`get_values`]: consistent multi-key reads split into bounded batches
//! - [`DirectoryBuilder`]: endpoint directories folded from watch events
//! - [`ServiceRegistry`]: service registration and discovery on top of all of the above
//!
//! Every component talks to the store through [`CoordinationStore`];
//! [`MemStore`] is the in-process implementation.

mod config;
pub mod constants;
mod directory;
mod errors;
mod kv;
mod lock;
pub mod metrics;
mod registry;
mod session;
mod store;
mod watch;

pub use config::*;
pub use directory::*;
pub use errors::*;
pub use kv::*;
pub use lock::*;
pub use metrics::*;
pub use registry::*;
pub use session::*;
pub use store::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;

#[cfg(test)]
mod errors_test;
