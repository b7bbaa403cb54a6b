//! Coordination store capability.
//!
//! The registry, watch, session and lock layers never talk to a concrete
//! store client. They depend on the narrow [`CoordinationStore`] trait, which
//! a production adapter implements on top of its RPC client and which
//! [`MemStore`] implements in memory for tests and embedded use.
//!
//! # Semantics expected from implementations
//!
//! - Every mutation bumps a store-wide, monotonically increasing revision.
//! - Reads may be pinned to a past revision until it is compacted.
//! - Watches deliver events with `mod_revision >= start_revision` in revision
//!   order; a watch asking for a compacted revision receives one response
//!   carrying `compact_revision` and `canceled = true`, then the stream ends.
//! - Keys attached to a lease are deleted when the lease expires or is revoked.

mod mem_store;
mod types;
pub use mem_store::*;
pub use types::*;


use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
#[cfg(test)]
use mockall::automock;

use crate::StoreResult;

/// Alias for store revision
pub type Revision = i64;

/// Alias for lease identifier
pub type LeaseId = i64;

/// Stream of watch notifications; ends when the server side terminates it
pub type WatchStream = Pin<Box<dyn Stream<Item = WatchResponse> + Send>>;

/// Key/value coordination store capability
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; a single instance is shared by every
/// background task and caller of this crate.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait CoordinationStore: Send + Sync + 'static {
    /// Reads `key` (or every key under it when `options.prefix` is set)
    async fn get(
        &self,
        key: &[u8],
        options: GetOptions,
    ) -> StoreResult<GetResponse>;

    /// Writes `key`, attaching it to `lease` when given
    async fn put(
        &self,
        key: &[u8],
        value: &[u8],
        lease: Option<LeaseId>,
    ) -> StoreResult<ResponseHeader>;

    /// Deletes `key` (or every key under it when `prefix` is set).
    /// Returns the number of deleted keys.
    async fn delete(
        &self,
        key: &[u8],
        prefix: bool,
    ) -> StoreResult<i64>;

    /// Executes `ops` atomically at a single revision
    async fn txn(
        &self,
        ops: Vec<TxnOp>,
    ) -> StoreResult<TxnResponse>;

    /// Opens a watch stream on `key`
    async fn watch(
        &self,
        key: &[u8],
        options: WatchOptions,
    ) -> StoreResult<WatchStream>;

    /// Grants a lease living `ttl_secs` seconds unless refreshed
    async fn grant_lease(
        &self,
        ttl_secs: i64,
    ) -> StoreResult<LeaseId>;

    /// Refreshes `lease`, returning its renewed TTL in seconds
    async fn keep_alive(
        &self,
        lease: LeaseId,
    ) -> StoreResult<i64>;

    /// Revokes `lease`, deleting every key attached to it
    async fn revoke_lease(
        &self,
        lease: LeaseId,
    ) -> StoreResult<()>;

    /// Blocks until the lock `name` is owned by `lease`.
    /// Returns the ownership key to pass to [`unlock`](Self::unlock).
    async fn lock(
        &self,
        name: &[u8],
        lease: LeaseId,
    ) -> StoreResult<Bytes>;

    /// Releases the lock identified by its ownership key
    async fn unlock(
        &self,
        key: &[u8],
    ) -> StoreResult<()>;
}
