use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use crate::BackoffPolicy;
use crate::CoordinationStore;
use crate::Event;
use crate::GetOptions;
use crate::KeyValue;
use crate::RegistryMetrics;
use crate::Result;
use crate::Revision;
use crate::WatchConfig;
use crate::WatchOptions;
use crate::WatchStream;

/// Progress shared between a handle and its background task
#[derive(Debug)]
struct WatchState {
    /// Resume revision: first revision the next stream must deliver
    revision: AtomicI64,
    dropped: AtomicU64,
    reconnects: AtomicU64,
}

impl WatchState {
    fn new(revision: Revision) -> Self {
        Self {
            revision: AtomicI64::new(revision),
            dropped: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
        }
    }

    /// Moves the cursor forward; never backwards
    fn advance(
        &self,
        revision: Revision,
    ) {
        self.revision.fetch_max(revision, Ordering::AcqRel);
    }

    fn revision(&self) -> Revision {
        self.revision.load(Ordering::Acquire)
    }
}

/// Opens prefix watches against a shared store
#[derive(Clone)]
pub struct WatchEngine {
    store: Arc<dyn CoordinationStore>,
    config: WatchConfig,
    metrics: Arc<RegistryMetrics>,
}

impl std::fmt::Debug for WatchEngine {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("WatchEngine").field("config", &self.config).finish()
    }
}

impl WatchEngine {
    pub fn new(
        store: Arc<dyn CoordinationStore>,
        config: WatchConfig,
        metrics: Arc<RegistryMetrics>,
    ) -> Self {
        Self {
            store,
            config,
            metrics,
        }
    }

    /// Snapshots `prefix` and follows every later change
    ///
    /// # Errors
    /// Fails only if the initial snapshot read fails; the live stream is
    /// reopened in the background for as long as the handle lives.
    pub async fn watch_prefix(
        &self,
        prefix: &str,
    ) -> Result<WatchHandle> {
        self.watch_prefix_with_token(prefix, CancellationToken::new()).await
    }

    /// Like [`watch_prefix`](Self::watch_prefix), stopping when `token` is cancelled
    pub async fn watch_prefix_with_token(
        &self,
        prefix: &str,
        token: CancellationToken,
    ) -> Result<WatchHandle> {
        let snapshot = self.store.get(prefix.as_bytes(), GetOptions::prefix()).await?;
        let state = Arc::new(WatchState::new(snapshot.header.revision + 1));
        let (tx, rx) = mpsc::channel(self.config.event_buffer_size);

        debug!(
            prefix,
            incipient = snapshot.kvs.len(),
            revision = snapshot.header.revision,
            "Watch snapshot taken"
        );

        let task = WatchTask {
            store: self.store.clone(),
            prefix: prefix.to_string(),
            tx,
            state: state.clone(),
            token: token.clone(),
            backoff: self.config.reconnect,
            metrics: self.metrics.clone(),
        };
        tokio::spawn(task.run());

        Ok(WatchHandle {
            incipient: snapshot.kvs,
            events: rx,
            guard: WatchGuard {
                prefix: prefix.to_string(),
                state,
                token,
            },
        })
    }
}

/// A live prefix watch
///
/// Dropping the handle closes the watch.
#[derive(Debug)]
pub struct WatchHandle {
    incipient: Vec<KeyValue>,
    events: mpsc::Receiver<Event>,
    guard: WatchGuard,
}

impl WatchHandle {
    pub fn prefix(&self) -> &str {
        &self.guard.prefix
    }

    /// Keys present under the prefix when the watch was created
    pub fn incipient(&self) -> &[KeyValue] {
        &self.incipient
    }

    /// Changes after the snapshot, in revision order
    pub fn events_mut(&mut self) -> &mut mpsc::Receiver<Event> {
        &mut self.events
    }

    /// Resume revision of the background task
    pub fn revision(&self) -> Revision {
        self.guard.revision()
    }

    /// Events discarded because the channel was full
    pub fn dropped_events(&self) -> u64 {
        self.guard.dropped_events()
    }

    /// Stream reopen attempts so far
    pub fn reconnects(&self) -> u64 {
        self.guard.state.reconnects.load(Ordering::Relaxed)
    }

    /// Stops the background task. Idempotent.
    pub fn close(&self) {
        self.guard.close();
    }

    pub fn is_closed(&self) -> bool {
        self.guard.token.is_cancelled()
    }

    /// Splits the handle; the watch stays open until the guard is dropped
    pub fn into_receiver(self) -> (Vec<KeyValue>, mpsc::Receiver<Event>, WatchGuard) {
        let WatchHandle {
            incipient,
            events,
            guard,
        } = self;
        (incipient, events, guard)
    }
}

/// Keeps a watch open; closes it when dropped
#[derive(Debug)]
pub struct WatchGuard {
    prefix: String,
    state: Arc<WatchState>,
    token: CancellationToken,
}

impl WatchGuard {
    pub fn revision(&self) -> Revision {
        self.state.revision()
    }

    pub fn dropped_events(&self) -> u64 {
        self.state.dropped.load(Ordering::Relaxed)
    }

    pub fn close(&self) {
        if !self.token.is_cancelled() {
            self.token.cancel();
            debug!(prefix = %self.prefix, "Watch closed");
        }
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.close();
        trace!(prefix = %self.prefix, "Watch guard dropped");
    }
}

enum StreamOutcome {
    /// Stream ended; `healthy` when it delivered at least one response,
    /// `compacted` when the store reported a compaction
    Ended { healthy: bool, compacted: bool },
    Cancelled,
    ReceiverClosed,
}

struct WatchTask {
    store: Arc<dyn CoordinationStore>,
    prefix: String,
    tx: mpsc::Sender<Event>,
    state: Arc<WatchState>,
    token: CancellationToken,
    backoff: BackoffPolicy,
    metrics: Arc<RegistryMetrics>,
}

impl WatchTask {
    async fn run(self) {
        let mut attempt: u32 = 0;
        let mut unpositioned = false;

        loop {
            let cursor = self.state.revision();
            let options = WatchOptions {
                prefix: true,
                start_revision: if unpositioned { 0 } else { cursor.max(0) },
                created_notify: true,
            };
            unpositioned = false;

            let opened = tokio::select! {
                _ = self.token.cancelled() => break,
                opened = self.store.watch(self.prefix.as_bytes(), options) => opened,
            };

            match opened {
                Ok(stream) => match self.consume(stream).await {
                    StreamOutcome::Cancelled => break,
                    StreamOutcome::ReceiverClosed => {
                        debug!(prefix = %self.prefix, "Watch receiver dropped, stopping task");
                        break;
                    }
                    StreamOutcome::Ended { healthy, compacted } => {
                        if healthy {
                            attempt = 0;
                        }
                        if compacted && self.state.revision() <= cursor {
                            warn!(
                                prefix = %self.prefix,
                                cursor,
                                "Compaction did not advance the watch cursor, reopening from the latest revision"
                            );
                            unpositioned = true;
                        }
                        info!(
                            prefix = %self.prefix,
                            resume_revision = self.state.revision(),
                            "Watch stream ended, reopening"
                        );
                    }
                },
                Err(e) => {
                    warn!(prefix = %self.prefix, cursor, error = %e, "Failed to open watch stream");
                }
            }

            let delay = self.backoff.delay(attempt);
            attempt = attempt.saturating_add(1);
            self.state.reconnects.fetch_add(1, Ordering::Relaxed);
            self.metrics.watch_reconnects.with_label_values(&[&self.prefix]).inc();

            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = self.tx.closed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        debug!(prefix = %self.prefix, "Watch task exited");
    }

    async fn consume(
        &self,
        mut stream: WatchStream,
    ) -> StreamOutcome {
        let mut healthy = false;
        let mut compacted = false;

        loop {
            let next = tokio::select! {
                _ = self.token.cancelled() => return StreamOutcome::Cancelled,
                _ = self.tx.closed() => return StreamOutcome::ReceiverClosed,
                next = stream.next() => next,
            };
            let Some(response) = next else {
                return StreamOutcome::Ended { healthy, compacted };
            };
            healthy = true;

            if response.compact_revision > 0 {
                warn!(
                    prefix = %self.prefix,
                    cursor = self.state.revision(),
                    compact_revision = response.compact_revision,
                    "Watch revision compacted; events were lost and consumers must reconcile"
                );
                self.state.advance(response.compact_revision);
                compacted = true;
            }

            if let Some(error) = &response.error {
                warn!(prefix = %self.prefix, %error, "Watch stream reported an error");
            }

            if response.events.is_empty() {
                if response.is_progress_notify() {
                    self.state.advance(response.header.revision + 1);
                }
                continue;
            }

            for event in response.events {
                let next_revision = event.kv.mod_revision + 1;
                match self.tx.try_send(event) {
                    Ok(()) => {}
                    Err(TrySendError::Full(event)) => {
                        self.state.dropped.fetch_add(1, Ordering::Relaxed);
                        self.metrics
                            .watch_events_dropped
                            .with_label_values(&[&self.prefix])
                            .inc();
                        warn!(
                            prefix = %self.prefix,
                            key = %event.kv.key_str(),
                            revision = event.kv.mod_revision,
                            "Watch event buffer full, dropping event"
                        );
                    }
                    Err(TrySendError::Closed(_)) => return StreamOutcome::ReceiverClosed,
                }
                self.state.advance(next_revision);
            }
        }
    }
}
