use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::constants::DEFAULT_SESSION_TTL_SECS;
use crate::CoordinationStore;
use crate::LeaseId;
use crate::Result;
use crate::StoreError;

/// A lease kept alive by a background task
pub struct Session {
    store: Arc<dyn CoordinationStore>,
    lease_id: LeaseId,
    ttl_secs: i64,
    /// Cancelled on close or when the lease is lost
    token: CancellationToken,
    closed: AtomicBool,
}

impl std::fmt::Debug for Session {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("lease_id", &format_args!("{:#x}", self.lease_id))
            .field("ttl_secs", &self.ttl_secs)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl Session {
    /// Grants a lease of `ttl_secs` (`<= 0` selects the 60s default) and
    /// starts refreshing it every third of its TTL.
    pub async fn new(
        store: Arc<dyn CoordinationStore>,
        ttl_secs: i64,
    ) -> Result<Self> {
        let ttl_secs = if ttl_secs <= 0 {
            DEFAULT_SESSION_TTL_SECS
        } else {
            ttl_secs
        };
        let lease_id = store.grant_lease(ttl_secs).await?;
        let token = CancellationToken::new();

        tokio::spawn(keep_alive_loop(
            store.clone(),
            lease_id,
            Duration::from_millis((ttl_secs as u64 * 1000 / 3).max(1)),
            token.clone(),
        ));
        debug!(lease = lease_id, ttl_secs, "Session opened");

        Ok(Self {
            store,
            lease_id,
            ttl_secs,
            token,
            closed: AtomicBool::new(false),
        })
    }

    pub fn lease_id(&self) -> LeaseId {
        self.lease_id
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Neither closed nor lost
    pub fn is_alive(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Resolves once the session is closed or its lease is lost
    pub async fn done(&self) {
        self.token.cancelled().await
    }

    /// Stops the keep-alive and revokes the lease. Idempotent.
    ///
    /// A lease that already expired counts as revoked.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.token.cancel();

        match self.store.revoke_lease(self.lease_id).await {
            Ok(()) | Err(StoreError::LeaseNotFound(_)) => {
                debug!(lease = self.lease_id, "Session closed");
                Ok(())
            }
            Err(e) => {
                warn!(lease = self.lease_id, error = %e, "Failed to revoke session lease; it will expire on its own");
                Err(e.into())
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn keep_alive_loop(
    store: Arc<dyn CoordinationStore>,
    lease_id: LeaseId,
    interval: Duration,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        match store.keep_alive(lease_id).await {
            Ok(ttl) => trace!(lease = lease_id, ttl, "Lease refreshed"),
            Err(StoreError::LeaseNotFound(_)) => {
                warn!(lease = lease_id, "Session lease lost");
                token.cancel();
                break;
            }
            Err(e) => warn!(lease = lease_id, error = %e, "Lease keep-alive failed, retrying"),
        }
    }
    trace!(lease = lease_id, "Keep-alive task exited");
}
