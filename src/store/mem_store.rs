//! In-memory coordination store.
//!
//! A single-process implementation of [`CoordinationStore`] with the
//! revision, compaction, lease, watch and lock semantics of a Raft-backed
//! store. It backs the crate's tests and embedded deployments where all
//! participants share one process.
//!
//! # Concurrency Model
//!
//! - All state lives behind one `parking_lot::Mutex`; no guard is held across
//!   an `.await`.
//! - Every committed revision is published on a broadcast channel while the
//!   state lock is held, so a watcher that subscribes under the same lock
//!   never misses nor duplicates a revision.
//! - History is bounded: once more than the history limit of revisions
//!   accumulate, older ones are compacted automatically.
//! - Leases expire lazily: every operation reaps expired leases first, lock
//!   waiters poll, and [`MemStore::spawn_lease_reaper`] runs the reaping in
//!   the background when keys must disappear without any other traffic.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::ops::Bound;
use std::sync::Arc;
use std::sync::Weak;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::CoordinationStore;
use super::Event;
use super::EventType;
use super::GetOptions;
use super::GetResponse;
use super::KeyValue;
use super::LeaseId;
use super::ResponseHeader;
use super::Revision;
use super::SortOrder;
use super::TxnOp;
use super::TxnOpResponse;
use super::TxnResponse;
use super::WatchOptions;
use super::WatchResponse;
use super::WatchStream;
use crate::constants::MAX_TXN_OPS;
use crate::StoreError;
use crate::StoreResult;

/// Buffered notifications per watch stream
const WATCH_STREAM_BUFFER: usize = 256;

/// Capacity of the revision broadcast shared by every watch stream
const REVISION_BROADCAST_CAPACITY: usize = 4096;

/// Revisions kept for watch replay by default
pub const DEFAULT_HISTORY_LIMIT: usize = 10_000;

/// How often a blocked lock waiter re-checks ownership
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Events committed at one revision
#[derive(Debug)]
struct RevisionBatch {
    revision: Revision,
    events: Vec<Event>,
}

#[derive(Debug)]
struct Version {
    revision: Revision,
    /// `None` marks a deletion
    kv: Option<KeyValue>,
}

#[derive(Debug)]
struct LeaseState {
    ttl_secs: i64,
    deadline: Instant,
    keys: BTreeSet<Bytes>,
}

#[derive(Debug, Default)]
struct MemState {
    revision: Revision,
    compacted: Revision,
    versions: BTreeMap<Bytes, Vec<Version>>,
    history: VecDeque<Arc<RevisionBatch>>,
    leases: HashMap<LeaseId, LeaseState>,
    next_lease: LeaseId,
}

impl MemState {
    /// Drops versions and history older than `revision`, keeping the newest
    /// version of every live key
    fn compact_to(
        &mut self,
        revision: Revision,
    ) {
        for versions in self.versions.values_mut() {
            let older = versions.iter().take_while(|v| v.revision < revision).count();
            if older == 0 {
                continue;
            }
            let mut drained: Vec<Version> = versions.drain(..older).collect();
            if let Some(base) = drained.pop() {
                if base.kv.is_some() {
                    versions.insert(0, base);
                }
            }
        }
        self.versions.retain(|_, versions| !versions.is_empty());

        while self.history.front().is_some_and(|b| b.revision < revision) {
            self.history.pop_front();
        }
        self.compacted = revision;
    }
}

#[derive(Debug)]
struct MemInner {
    state: Mutex<MemState>,
    revisions_tx: broadcast::Sender<Arc<RevisionBatch>>,
    sever: Mutex<CancellationToken>,
    lock_released: Notify,
    max_txn_ops: usize,
    /// Revisions kept for watch replay before older ones are compacted
    history_limit: usize,
}

/// In-memory [`CoordinationStore`]
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone, Debug)]
pub struct MemStore {
    inner: Arc<MemInner>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self::build(MAX_TXN_OPS, DEFAULT_HISTORY_LIMIT)
    }

    /// Creates a store rejecting transactions with more than `max_txn_ops` operations
    pub fn with_max_txn_ops(max_txn_ops: usize) -> Self {
        Self::build(max_txn_ops, DEFAULT_HISTORY_LIMIT)
    }

    /// Creates a store that keeps the last `history_limit` revisions and
    /// compacts everything older as new revisions are committed.
    ///
    /// Watches resuming from a compacted revision receive a compaction
    /// response, as with [`compact`](Self::compact).
    pub fn with_history_limit(history_limit: usize) -> Self {
        Self::build(MAX_TXN_OPS, history_limit)
    }

    fn build(
        max_txn_ops: usize,
        history_limit: usize,
    ) -> Self {
        let (revisions_tx, _) = broadcast::channel(REVISION_BROADCAST_CAPACITY);
        Self {
            inner: Arc::new(MemInner {
                state: Mutex::new(MemState {
                    next_lease: 0x10,
                    ..Default::default()
                }),
                revisions_tx,
                sever: Mutex::new(CancellationToken::new()),
                lock_released: Notify::new(),
                max_txn_ops,
                history_limit: history_limit.max(1),
            }),
        }
    }

    /// Current store revision
    pub fn revision(&self) -> Revision {
        self.inner.state.lock().revision
    }

    /// Oldest revision still readable
    pub fn compacted_revision(&self) -> Revision {
        self.inner.state.lock().compacted
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let state = self.inner.state.lock();
        state.versions.values().filter(|v| latest(v).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of leases not yet expired or revoked
    pub fn lease_count(&self) -> usize {
        let mut state = self.inner.state.lock();
        self.inner.reap_expired(&mut state);
        state.leases.len()
    }

    /// Discards history older than `revision`.
    ///
    /// Reads and watches asking for an older revision fail afterwards.
    pub fn compact(
        &self,
        revision: Revision,
    ) -> StoreResult<()> {
        let mut state = self.inner.state.lock();
        if revision <= state.compacted {
            return Ok(());
        }
        if revision > state.revision {
            return Err(StoreError::FutureRevision {
                requested: revision,
                current: state.revision,
            });
        }

        state.compact_to(revision);
        debug!(revision, "MemStore compacted");
        Ok(())
    }

    /// Terminates every live watch stream, as a lost connection would.
    pub fn sever_watches(&self) {
        let old = std::mem::replace(&mut *self.inner.sever.lock(), CancellationToken::new());
        old.cancel();
        debug!("MemStore severed all watch streams");
    }

    /// Deletes the keys of every expired lease now
    pub fn expire_leases(&self) {
        let mut state = self.inner.state.lock();
        self.inner.reap_expired(&mut state);
    }

    /// Reaps expired leases every `interval` until the store is dropped
    pub fn spawn_lease_reaper(
        &self,
        interval: Duration,
    ) -> JoinHandle<()> {
        let weak: Weak<MemInner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let mut state = inner.state.lock();
                inner.reap_expired(&mut state);
            }
        })
    }
}

impl MemInner {
    /// Records `events` as revision `state.revision + 1` and publishes them
    fn commit(
        &self,
        state: &mut MemState,
        events: Vec<Event>,
    ) {
        if events.is_empty() {
            return;
        }
        let revision = state.revision + 1;
        state.revision = revision;

        let released = events.iter().any(|e| e.event_type == EventType::Delete);
        let batch = Arc::new(RevisionBatch { revision, events });
        state.history.push_back(batch.clone());
        // No receivers is fine: nobody is watching.
        let _ = self.revisions_tx.send(batch);

        if state.history.len() > self.history_limit {
            let keep_from = state.history[state.history.len() - self.history_limit].revision;
            state.compact_to(keep_from);
            debug!(revision = keep_from, "MemStore history limit reached, compacted");
        }

        if released {
            self.lock_released.notify_waiters();
        }
        trace!(revision, "MemStore committed revision");
    }

    fn reap_expired(
        &self,
        state: &mut MemState,
    ) {
        let now = Instant::now();
        let expired: Vec<LeaseId> = state
            .leases
            .iter()
            .filter(|(_, lease)| lease.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        if expired.is_empty() {
            return;
        }

        let revision = state.revision + 1;
        let mut events = Vec::new();
        for id in expired {
            if let Some(lease) = state.leases.remove(&id) {
                debug!(lease = id, keys = lease.keys.len(), "Lease expired");
                for key in lease.keys {
                    events.extend(state.delete_kv(&key, revision));
                }
            }
        }
        self.commit(state, events);
    }
}

impl MemState {
    fn check_read_revision(
        &self,
        revision: Revision,
    ) -> StoreResult<()> {
        if revision <= 0 {
            return Ok(());
        }
        if revision < self.compacted {
            return Err(StoreError::Compacted {
                requested: revision,
                compacted: self.compacted,
            });
        }
        if revision > self.revision {
            return Err(StoreError::FutureRevision {
                requested: revision,
                current: self.revision,
            });
        }
        Ok(())
    }

    fn current(
        &self,
        key: &[u8],
    ) -> Option<&KeyValue> {
        self.versions.get(key).and_then(|v| latest(v))
    }

    fn range(
        &self,
        key: &[u8],
        options: &GetOptions,
    ) -> Vec<KeyValue> {
        let pick = |versions: &Vec<Version>| -> Option<KeyValue> {
            if options.revision > 0 {
                versions
                    .iter()
                    .rev()
                    .find(|v| v.revision <= options.revision)
                    .and_then(|v| v.kv.clone())
            } else {
                latest(versions).cloned()
            }
        };

        let mut kvs: Vec<KeyValue> = if options.prefix {
            self.versions
                .range::<[u8], _>((Bound::Included(key), Bound::Unbounded))
                .take_while(|(k, _)| k.starts_with(key))
                .filter_map(|(_, versions)| pick(versions))
                .collect()
        } else {
            self.versions.get(key).and_then(pick).into_iter().collect()
        };

        if options.sort == SortOrder::Descend {
            kvs.reverse();
        }
        kvs
    }

    fn put_kv(
        &mut self,
        key: Bytes,
        value: Bytes,
        lease: Option<LeaseId>,
        revision: Revision,
    ) -> StoreResult<Event> {
        let lease = lease.unwrap_or(0);
        if lease != 0 && !self.leases.contains_key(&lease) {
            return Err(StoreError::LeaseNotFound(lease));
        }

        let previous = self.current(&key).cloned();
        if let Some(prev) = &previous {
            if prev.lease != 0 && prev.lease != lease {
                if let Some(old) = self.leases.get_mut(&prev.lease) {
                    old.keys.remove(&key);
                }
            }
        }
        if let Some(attached) = self.leases.get_mut(&lease) {
            attached.keys.insert(key.clone());
        }

        let kv = KeyValue {
            key: key.clone(),
            value,
            create_revision: previous.map(|p| p.create_revision).unwrap_or(revision),
            mod_revision: revision,
            lease,
        };
        self.versions.entry(key).or_default().push(Version {
            revision,
            kv: Some(kv.clone()),
        });

        Ok(Event {
            event_type: EventType::Put,
            kv,
        })
    }

    fn delete_kv(
        &mut self,
        key: &[u8],
        revision: Revision,
    ) -> Option<Event> {
        let previous = self.current(key).cloned()?;
        if previous.lease != 0 {
            if let Some(lease) = self.leases.get_mut(&previous.lease) {
                lease.keys.remove(key);
            }
        }
        if let Some(versions) = self.versions.get_mut(key) {
            versions.push(Version { revision, kv: None });
        }

        Some(Event {
            event_type: EventType::Delete,
            kv: KeyValue {
                key: previous.key,
                value: Bytes::new(),
                create_revision: 0,
                mod_revision: revision,
                lease: 0,
            },
        })
    }

    fn delete_range(
        &mut self,
        key: &[u8],
        prefix: bool,
        revision: Revision,
    ) -> Vec<Event> {
        let targets: Vec<Bytes> = self
            .range(
                key,
                &GetOptions {
                    prefix,
                    ..Default::default()
                },
            )
            .into_iter()
            .map(|kv| kv.key)
            .collect();

        targets
            .iter()
            .filter_map(|k| self.delete_kv(k, revision))
            .collect()
    }
}

fn latest(versions: &[Version]) -> Option<&KeyValue> {
    versions.last().and_then(|v| v.kv.as_ref())
}

fn key_matches(
    candidate: &[u8],
    key: &[u8],
    prefix: bool,
) -> bool {
    if prefix {
        candidate.starts_with(key)
    } else {
        candidate == key
    }
}

fn filter_batch(
    batch: &RevisionBatch,
    key: &[u8],
    prefix: bool,
) -> Option<WatchResponse> {
    let events: Vec<Event> = batch
        .events
        .iter()
        .filter(|e| key_matches(&e.kv.key, key, prefix))
        .cloned()
        .collect();
    if events.is_empty() {
        return None;
    }
    Some(WatchResponse {
        header: ResponseHeader {
            revision: batch.revision,
        },
        events,
        ..Default::default()
    })
}

/// Sends `response` unless the stream was severed or its reader dropped
async fn forward_one(
    tx: &mpsc::Sender<WatchResponse>,
    response: WatchResponse,
    sever: &CancellationToken,
) -> bool {
    tokio::select! {
        _ = sever.cancelled() => false,
        sent = tx.send(response) => sent.is_ok(),
    }
}

struct WatchFeed {
    key: Bytes,
    prefix: bool,
    created: Option<WatchResponse>,
    replay: Vec<Arc<RevisionBatch>>,
    replayed_up_to: Revision,
    live: broadcast::Receiver<Arc<RevisionBatch>>,
}

async fn run_watch_feed(
    mut feed: WatchFeed,
    tx: mpsc::Sender<WatchResponse>,
    sever: CancellationToken,
) {
    if let Some(created) = feed.created.take() {
        if !forward_one(&tx, created, &sever).await {
            return;
        }
    }

    for batch in std::mem::take(&mut feed.replay) {
        if let Some(response) = filter_batch(&batch, &feed.key, feed.prefix) {
            if !forward_one(&tx, response, &sever).await {
                return;
            }
        }
    }

    loop {
        let received = tokio::select! {
            _ = sever.cancelled() => return,
            _ = tx.closed() => return,
            received = feed.live.recv() => received,
        };

        match received {
            Ok(batch) => {
                if batch.revision <= feed.replayed_up_to {
                    continue;
                }
                if let Some(response) = filter_batch(&batch, &feed.key, feed.prefix) {
                    if !forward_one(&tx, response, &sever).await {
                        return;
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "MemStore watch stream lagged; canceling it");
                let _ = tx.try_send(WatchResponse {
                    canceled: true,
                    error: Some(format!("watch stream lagged behind by {skipped} revisions")),
                    ..Default::default()
                });
                return;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Removes a lock waiter key when the waiting future is dropped before owning the lock
struct PendingLock {
    inner: Arc<MemInner>,
    key: Bytes,
    armed: bool,
}

impl Drop for PendingLock {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.inner.state.lock();
        let revision = state.revision + 1;
        let events: Vec<Event> = state.delete_kv(&self.key, revision).into_iter().collect();
        self.inner.commit(&mut state, events);
        debug!(key = ?self.key, "Abandoned lock waiter removed");
    }
}

#[async_trait::async_trait]
impl CoordinationStore for MemStore {
    async fn get(
        &self,
        key: &[u8],
        options: GetOptions,
    ) -> StoreResult<GetResponse> {
        let mut state = self.inner.state.lock();
        self.inner.reap_expired(&mut state);
        state.check_read_revision(options.revision)?;

        Ok(GetResponse {
            header: ResponseHeader {
                revision: state.revision,
            },
            kvs: state.range(key, &options),
        })
    }

    async fn put(
        &self,
        key: &[u8],
        value: &[u8],
        lease: Option<LeaseId>,
    ) -> StoreResult<ResponseHeader> {
        let mut state = self.inner.state.lock();
        self.inner.reap_expired(&mut state);

        let revision = state.revision + 1;
        let event = state.put_kv(
            Bytes::copy_from_slice(key),
            Bytes::copy_from_slice(value),
            lease,
            revision,
        )?;
        self.inner.commit(&mut state, vec![event]);

        Ok(ResponseHeader {
            revision: state.revision,
        })
    }

    async fn delete(
        &self,
        key: &[u8],
        prefix: bool,
    ) -> StoreResult<i64> {
        let mut state = self.inner.state.lock();
        self.inner.reap_expired(&mut state);

        let revision = state.revision + 1;
        let events = state.delete_range(key, prefix, revision);
        let deleted = events.len() as i64;
        self.inner.commit(&mut state, events);
        Ok(deleted)
    }

    async fn txn(
        &self,
        ops: Vec<TxnOp>,
    ) -> StoreResult<TxnResponse> {
        if ops.len() > self.inner.max_txn_ops {
            return Err(StoreError::TooManyOps {
                ops: ops.len(),
                max: self.inner.max_txn_ops,
            });
        }

        let mut state = self.inner.state.lock();
        self.inner.reap_expired(&mut state);

        for op in &ops {
            if let TxnOp::Get { options, .. } = op {
                state.check_read_revision(options.revision)?;
            }
            if let TxnOp::Put { lease: Some(lease), .. } = op {
                if !state.leases.contains_key(lease) {
                    return Err(StoreError::LeaseNotFound(*lease));
                }
            }
        }

        let revision = state.revision + 1;
        let mut events = Vec::new();
        let mut responses = Vec::with_capacity(ops.len());
        for op in ops {
            match op {
                TxnOp::Get { key, options } => {
                    responses.push(TxnOpResponse::Get(GetResponse {
                        header: ResponseHeader {
                            revision: state.revision,
                        },
                        kvs: state.range(&key, &options),
                    }));
                }
                TxnOp::Put { key, value, lease } => {
                    events.push(state.put_kv(key, value, lease, revision)?);
                    responses.push(TxnOpResponse::Put);
                }
                TxnOp::Delete { key, prefix } => {
                    let deleted = state.delete_range(&key, prefix, revision);
                    responses.push(TxnOpResponse::Delete {
                        deleted: deleted.len() as i64,
                    });
                    events.extend(deleted);
                }
            }
        }
        self.inner.commit(&mut state, events);

        Ok(TxnResponse {
            header: ResponseHeader {
                revision: state.revision,
            },
            responses,
        })
    }

    async fn watch(
        &self,
        key: &[u8],
        options: WatchOptions,
    ) -> StoreResult<WatchStream> {
        let (tx, rx) = mpsc::channel(WATCH_STREAM_BUFFER);
        let sever = self.inner.sever.lock().clone();

        let feed = {
            let mut state = self.inner.state.lock();
            self.inner.reap_expired(&mut state);

            if options.start_revision > 0 && options.start_revision < state.compacted {
                debug!(
                    requested = options.start_revision,
                    compacted = state.compacted,
                    "Watch requested a compacted revision"
                );
                let _ = tx.try_send(WatchResponse {
                    header: ResponseHeader {
                        revision: state.revision,
                    },
                    compact_revision: state.compacted,
                    canceled: true,
                    error: Some("required revision has been compacted".to_string()),
                    ..Default::default()
                });
                return Ok(Box::pin(ReceiverStream::new(rx)));
            }

            let replay: Vec<Arc<RevisionBatch>> = if options.start_revision > 0 {
                state
                    .history
                    .iter()
                    .filter(|b| b.revision >= options.start_revision)
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };

            WatchFeed {
                key: Bytes::copy_from_slice(key),
                prefix: options.prefix,
                created: options.created_notify.then(|| WatchResponse {
                    header: ResponseHeader {
                        revision: state.revision,
                    },
                    created: true,
                    ..Default::default()
                }),
                replay,
                replayed_up_to: state.revision,
                live: self.inner.revisions_tx.subscribe(),
            }
        };

        tokio::spawn(run_watch_feed(feed, tx, sever));
        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn grant_lease(
        &self,
        ttl_secs: i64,
    ) -> StoreResult<LeaseId> {
        if ttl_secs <= 0 {
            return Err(StoreError::InvalidArgument(format!(
                "lease TTL must be positive, got {ttl_secs}"
            )));
        }
        let mut state = self.inner.state.lock();
        self.inner.reap_expired(&mut state);

        let id = state.next_lease;
        state.next_lease += 1;
        state.leases.insert(
            id,
            LeaseState {
                ttl_secs,
                deadline: Instant::now() + Duration::from_secs(ttl_secs as u64),
                keys: BTreeSet::new(),
            },
        );
        debug!(lease = id, ttl_secs, "Lease granted");
        Ok(id)
    }

    async fn keep_alive(
        &self,
        lease: LeaseId,
    ) -> StoreResult<i64> {
        let mut state = self.inner.state.lock();
        self.inner.reap_expired(&mut state);

        let entry = state.leases.get_mut(&lease).ok_or(StoreError::LeaseNotFound(lease))?;
        entry.deadline = Instant::now() + Duration::from_secs(entry.ttl_secs as u64);
        Ok(entry.ttl_secs)
    }

    async fn revoke_lease(
        &self,
        lease: LeaseId,
    ) -> StoreResult<()> {
        let mut state = self.inner.state.lock();
        self.inner.reap_expired(&mut state);

        let entry = state.leases.remove(&lease).ok_or(StoreError::LeaseNotFound(lease))?;
        let revision = state.revision + 1;
        let events: Vec<Event> = entry
            .keys
            .iter()
            .filter_map(|key| state.delete_kv(key, revision))
            .collect();
        self.inner.commit(&mut state, events);
        debug!(lease, "Lease revoked");
        Ok(())
    }

    async fn lock(
        &self,
        name: &[u8],
        lease: LeaseId,
    ) -> StoreResult<Bytes> {
        let mut prefix = name.to_vec();
        prefix.push(b'/');
        let mut owned = prefix.clone();
        owned.extend_from_slice(format!("{lease:x}").as_bytes());
        let key = Bytes::from(owned);

        {
            let mut state = self.inner.state.lock();
            self.inner.reap_expired(&mut state);
            if !state.leases.contains_key(&lease) {
                return Err(StoreError::LeaseNotFound(lease));
            }
            if state.current(&key).is_none() {
                let revision = state.revision + 1;
                let event = state.put_kv(key.clone(), Bytes::new(), Some(lease), revision)?;
                self.inner.commit(&mut state, vec![event]);
            }
        }

        let mut pending = PendingLock {
            inner: self.inner.clone(),
            key: key.clone(),
            armed: true,
        };

        loop {
            let released = self.inner.lock_released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            {
                let mut state = self.inner.state.lock();
                self.inner.reap_expired(&mut state);

                if state.current(&key).is_none() {
                    pending.armed = false;
                    return Err(StoreError::LeaseNotFound(lease));
                }
                let owner = state
                    .range(&prefix, &GetOptions::prefix())
                    .into_iter()
                    .min_by_key(|kv| kv.create_revision);
                if owner.is_some_and(|kv| kv.key == key) {
                    pending.armed = false;
                    debug!(key = ?key, "Lock acquired");
                    return Ok(key);
                }
            }

            tokio::select! {
                _ = &mut released => {}
                _ = tokio::time::sleep(LOCK_POLL_INTERVAL) => {}
            }
        }
    }

    async fn unlock(
        &self,
        key: &[u8],
    ) -> StoreResult<()> {
        let mut state = self.inner.state.lock();
        self.inner.reap_expired(&mut state);

        let revision = state.revision + 1;
        let events: Vec<Event> = state.delete_kv(key, revision).into_iter().collect();
        self.inner.commit(&mut state, events);
        debug!(key = ?Bytes::copy_from_slice(key), "Lock released");
        Ok(())
    }
}
