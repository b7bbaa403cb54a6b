//! Coordination Client Error Hierarchy
//!
//! Defines the error types surfaced by the registry, watch, session and lock
//! layers, categorized by where the failure originated.

use std::time::Duration;

use config::ConfigError;

use crate::LeaseId;
use crate::Revision;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for calls against the [`crate::CoordinationStore`] capability
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Coordination store RPC failures (transient I/O)
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Settings loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Distributed lock acquisition/release failures
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Malformed key or value payload
    #[error("Failed to decode entry at key {key}: {reason}")]
    Decode { key: String, reason: String },

    /// Service descriptor unusable for building registry keys
    #[error("Invalid service descriptor: {0}")]
    InvalidService(String),

    /// Operation attempted after the registry was closed
    #[error("Registry is closed")]
    Closed,

    /// Caller-supplied deadline exceeded
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        operation: &'static str,
        duration: Duration,
    },

    /// Value encoding failures
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Metric registration failures
    #[error(transparent)]
    Metrics(#[from] prometheus::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Store endpoint unreachable or connection lost
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Requested revision has already been discarded by compaction
    #[error("Required revision {requested} has been compacted (compact revision: {compacted})")]
    Compacted {
        requested: Revision,
        compacted: Revision,
    },

    /// Requested revision is newer than the store's current revision
    #[error("Required revision {requested} is a future revision (current: {current})")]
    FutureRevision { requested: Revision, current: Revision },

    /// Lease was revoked or expired
    #[error("Lease {0:#x} not found")]
    LeaseNotFound(LeaseId),

    /// Transaction exceeds the per-transaction operation ceiling
    #[error("Too many operations in txn request: {ops} (max {max})")]
    TooManyOps { ops: usize, max: usize },

    /// Invalid request parameters
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Server-side failure
    #[error("Store internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    /// Lock not acquired before the deadline
    #[error("Lock {name} not acquired within {duration:?}")]
    Timeout { name: String, duration: Duration },

    /// `lock` called on a mutex that already holds the lock
    #[error("Lock {0} is already held by this mutex")]
    AlreadyHeld(String),

    /// Mutex was unlocked and its session closed; create a new one
    #[error("Mutex for lock {0} has been released and cannot be reused")]
    AlreadyReleased(String),

    /// `unlock` called before `lock` succeeded
    #[error("Lock {0} is not held")]
    NotHeld(String),
}

impl Error {
    /// Builds a timeout error for `operation` bounded by `duration`
    pub(crate) fn timeout(
        operation: &'static str,
        duration: Duration,
    ) -> Self {
        Error::Timeout { operation, duration }
    }

    /// Whether the failure is a transient store error worth retrying by the caller
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Store(StoreError::Unavailable(_)) | Error::Timeout { .. }
        )
    }
}
