//! Resilient prefix watches.
//!
//! A [`WatchHandle`] pairs a consistent snapshot of a key prefix (the
//! *incipient* key set) with a live stream of every later change, delivered
//! through a bounded channel by one background task.
//!
//! # Architecture
//!
//! ```text
//! watch_prefix():
//!   store.get(prefix) -> incipient kvs + header revision R -> cursor = R + 1
//!
//! Background task (one per handle):
//!   loop {
//!     store.watch(prefix, start_revision = cursor)
//!        -> per event: try_send(event_channel), cursor = mod_revision + 1
//!        -> compaction: cursor = compact_revision
//!        -> progress notify: cursor = header.revision + 1
//!     stream ended / open failed -> jittered backoff, reopen at cursor
//!   }
//! ```
//!
//! # Error Handling
//!
//! - The event channel drops the newest event when full; drops are counted
//!   on the handle and in `watch_events_dropped_total`.
//! - A compaction means events between the old cursor and the compaction
//!   revision are gone; consumers must reconcile with a fresh read.
//! - The task never gives up on its own; only closing the handle (or
//!   cancelling the token it was created with) stops it.

mod watcher;
pub use watcher::*;
