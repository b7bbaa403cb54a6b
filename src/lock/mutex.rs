use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;
use tracing::warn;

use crate::CoordinationStore;
use crate::Error;
use crate::LockConfig;
use crate::LockError;
use crate::Result;
use crate::Session;

#[derive(Debug, Clone, Copy)]
pub struct MutexOptions {
    /// TTL of the session backing the mutex, in seconds
    pub ttl_secs: i64,
}

impl Default for MutexOptions {
    fn default() -> Self {
        Self::from(&LockConfig::default())
    }
}

impl From<&LockConfig> for MutexOptions {
    fn from(config: &LockConfig) -> Self {
        Self {
            ttl_secs: config.session_ttl_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MutexState {
    Idle,
    /// Holds the ownership key returned by the store
    Locked(Bytes),
    Released,
}

/// A cluster-wide mutex bound to its own session
///
/// `Idle → Locked → Released`; a released mutex cannot be locked again.
/// If the holder crashes, the session lease expires and the lock is freed.
pub struct DistributedMutex {
    store: Arc<dyn CoordinationStore>,
    name: String,
    session: Session,
    state: MutexState,
}

impl std::fmt::Debug for DistributedMutex {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DistributedMutex")
            .field("name", &self.name)
            .field("session", &self.session)
            .field("state", &self.state)
            .finish()
    }
}

impl DistributedMutex {
    /// Opens a dedicated session for the lock `name`
    pub async fn new(
        store: Arc<dyn CoordinationStore>,
        name: impl Into<String>,
        options: MutexOptions,
    ) -> Result<Self> {
        let session = Session::new(store.clone(), options.ttl_secs).await?;
        Ok(Self {
            store,
            name: name.into(),
            session,
            state: MutexState::Idle,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, MutexState::Locked(_))
    }

    /// Ownership key while the lock is held
    pub fn lock_key(&self) -> Option<&Bytes> {
        match &self.state {
            MutexState::Locked(key) => Some(key),
            _ => None,
        }
    }

    /// Blocks until the lock is acquired or `timeout` elapses
    ///
    /// # Errors
    /// - [`LockError::Timeout`] when the deadline passes; the pending waiter is withdrawn
    /// - [`LockError::AlreadyHeld`] / [`LockError::AlreadyReleased`] on misuse
    /// - [`Error::Store`] when the store rejects the request
    pub async fn lock(
        &mut self,
        timeout: Duration,
    ) -> Result<()> {
        match self.state {
            MutexState::Idle => {}
            MutexState::Locked(_) => return Err(LockError::AlreadyHeld(self.name.clone()).into()),
            MutexState::Released => {
                return Err(LockError::AlreadyReleased(self.name.clone()).into());
            }
        }

        let acquire = self.store.lock(self.name.as_bytes(), self.session.lease_id());
        let key = match tokio::time::timeout(timeout, acquire).await {
            Ok(acquired) => acquired?,
            Err(_) => {
                debug!(name = %self.name, ?timeout, "Lock wait timed out");
                return Err(LockError::Timeout {
                    name: self.name.clone(),
                    duration: timeout,
                }
                .into());
            }
        };

        debug!(name = %self.name, key = %String::from_utf8_lossy(&key), "Lock acquired");
        self.state = MutexState::Locked(key);
        Ok(())
    }

    /// Releases the lock, then closes the session
    ///
    /// If releasing fails the mutex stays locked with its session open, so
    /// the call may be retried. A failure closing the session afterwards is
    /// only logged: the lock is already free and the lease will expire.
    pub async fn unlock(
        &mut self,
        timeout: Duration,
    ) -> Result<()> {
        let key = match &self.state {
            MutexState::Locked(key) => key.clone(),
            MutexState::Idle => return Err(LockError::NotHeld(self.name.clone()).into()),
            MutexState::Released => {
                return Err(LockError::AlreadyReleased(self.name.clone()).into());
            }
        };

        tokio::time::timeout(timeout, self.store.unlock(&key))
            .await
            .map_err(|_| Error::timeout("unlock", timeout))??;
        self.state = MutexState::Released;
        debug!(name = %self.name, "Lock released");

        match tokio::time::timeout(timeout, self.session.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(name = %self.name, error = %e, "Failed to close lock session"),
            Err(_) => warn!(name = %self.name, ?timeout, "Closing lock session timed out"),
        }
        Ok(())
    }
}
