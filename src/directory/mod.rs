//! Endpoint directory: the categorized, in-memory view of one service's
//! registry subtree.
//!
//! # Key classification
//!
//! Keys are matched after stripping the watched prefix
//! (`/{registry_prefix}/{service}/`):
//!
//! ```text
//! providers/grpc://10.0.0.1:8080           -> nodes
//! configurators/grpc://routes/blue          -> route_configs
//! configurators/grpc://10.0.0.1:8080/providers/p1 -> provider_configs
//! providers/10.0.0.1:8080 (DELETE only)     -> removed from nodes and route_configs
//! ```
//!
//! The directory has a single writer, the [`DirectoryBuilder`] consuming a
//! watch; readers only ever receive deep clones.

mod builder;
mod config_record;
mod endpoint_directory;
pub use builder::*;
pub use config_record::*;
pub use endpoint_directory::*;
