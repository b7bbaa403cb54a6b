//! Lease-backed sessions.
//!
//! A [`Session`] owns one lease and keeps it alive until closed. Keys written
//! with the session's lease disappear when the process stops refreshing it,
//! which is how crashed registrants vanish from the registry.

mod lease_session;
mod session_manager;
pub use lease_session::*;
pub use session_manager::*;
