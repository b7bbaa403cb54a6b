use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::debug;
use tracing::warn;

use super::Session;
use crate::CoordinationStore;
use crate::Result;

/// Caches one [`Session`] per registration key
pub struct SessionManager {
    store: Arc<dyn CoordinationStore>,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(store: Arc<dyn CoordinationStore>) -> Self {
        Self {
            store,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the live session cached for `key`, creating it on first use
    ///
    /// Concurrent first-time callers share one session. A cached session
    /// whose lease was lost is replaced.
    pub async fn get_or_create(
        &self,
        key: &str,
        ttl_secs: i64,
    ) -> Result<Arc<Session>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(key).filter(|s| s.is_alive()) {
                return Ok(session.clone());
            }
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(key) {
            if session.is_alive() {
                return Ok(session.clone());
            }
            debug!(key, lease = session.lease_id(), "Replacing lost session");
        }

        let session = Arc::new(Session::new(self.store.clone(), ttl_secs).await?);
        sessions.insert(key.to_string(), session.clone());
        debug!(key, lease = session.lease_id(), "Session cached");
        Ok(session)
    }

    pub async fn get(
        &self,
        key: &str,
    ) -> Option<Arc<Session>> {
        self.sessions.read().await.get(key).cloned()
    }

    /// Removes and closes the session of `key`; no-op when absent
    pub async fn release(
        &self,
        key: &str,
    ) -> Result<()> {
        let removed = self.sessions.write().await.remove(key);
        match removed {
            Some(session) => session.close().await,
            None => Ok(()),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Closes every cached session
    pub async fn close_all(&self) {
        let drained: Vec<(String, Arc<Session>)> = self.sessions.write().await.drain().collect();
        let results = join_all(drained.iter().map(|(_, session)| session.close())).await;

        for ((key, _), result) in drained.iter().zip(results) {
            if let Err(e) = result {
                warn!(key, error = %e, "Failed to close session");
            }
        }
    }
}
