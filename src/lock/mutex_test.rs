use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::timeout;

use super::*;
use crate::test_utils::mem_store;
use crate::CoordinationStore;
use crate::Error;
use crate::GetOptions;
use crate::LockError;
use crate::MockCoordinationStore;
use crate::StoreError;

const LOCK: &str = "/locks/reindex";
const WAIT: Duration = Duration::from_secs(1);

async fn mutex(store: &Arc<dyn CoordinationStore>) -> DistributedMutex {
    DistributedMutex::new(store.clone(), LOCK, MutexOptions { ttl_secs: 60 })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_lock_and_unlock() {
    let (store, shared) = mem_store();
    let mut m = mutex(&shared).await;

    m.lock(WAIT).await.unwrap();
    assert!(m.is_locked());
    assert!(m.lock_key().unwrap().starts_with(b"/locks/reindex/"));

    m.unlock(WAIT).await.unwrap();
    assert!(!m.is_locked());
    assert!(!m.session().is_alive());
    assert!(store.is_empty());
    assert_eq!(store.lease_count(), 0);
}

#[tokio::test]
async fn test_second_client_blocks_until_release() {
    let (_store, shared) = mem_store();
    let mut first = mutex(&shared).await;
    let mut second = mutex(&shared).await;

    first.lock(WAIT).await.unwrap();

    let contender = tokio::spawn(async move {
        second.lock(WAIT).await.map(|_| second)
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!contender.is_finished());

    first.unlock(WAIT).await.unwrap();
    let second = timeout(WAIT, contender).await.unwrap().unwrap().unwrap();
    assert!(second.is_locked());
}

#[tokio::test]
async fn test_lock_timeout_withdraws_waiter() {
    let (store, shared) = mem_store();
    let mut holder = mutex(&shared).await;
    let mut waiter = mutex(&shared).await;
    holder.lock(WAIT).await.unwrap();

    let err = waiter.lock(Duration::from_millis(100)).await.unwrap_err();
    assert!(matches!(err, Error::Lock(LockError::Timeout { .. })));
    assert!(!waiter.is_locked());

    let queued = store.get(b"/locks/reindex/", GetOptions::prefix()).await.unwrap();
    assert_eq!(queued.kvs.len(), 1);
    assert_eq!(queued.kvs[0].lease, holder.session().lease_id());

    // The timed-out mutex can still try again
    holder.unlock(WAIT).await.unwrap();
    waiter.lock(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_lock_twice_is_rejected() {
    let (_store, shared) = mem_store();
    let mut m = mutex(&shared).await;
    m.lock(WAIT).await.unwrap();

    let err = m.lock(WAIT).await.unwrap_err();
    assert!(matches!(err, Error::Lock(LockError::AlreadyHeld(_))));
}

#[tokio::test]
async fn test_unlock_without_lock_is_rejected() {
    let (_store, shared) = mem_store();
    let mut m = mutex(&shared).await;

    let err = m.unlock(WAIT).await.unwrap_err();
    assert!(matches!(err, Error::Lock(LockError::NotHeld(_))));
    assert!(m.session().is_alive());
}

#[tokio::test]
async fn test_released_mutex_cannot_be_reused() {
    let (_store, shared) = mem_store();
    let mut m = mutex(&shared).await;
    m.lock(WAIT).await.unwrap();
    m.unlock(WAIT).await.unwrap();

    assert!(matches!(
        m.lock(WAIT).await.unwrap_err(),
        Error::Lock(LockError::AlreadyReleased(_))
    ));
    assert!(matches!(
        m.unlock(WAIT).await.unwrap_err(),
        Error::Lock(LockError::AlreadyReleased(_))
    ));
}

#[tokio::test]
async fn test_unlock_failure_keeps_session_and_allows_retry() {
    let unlock_calls = Arc::new(AtomicUsize::new(0));
    let mut mock = MockCoordinationStore::new();
    mock.expect_grant_lease().returning(|_| Ok(42));
    mock.expect_keep_alive().returning(|_| Ok(60));
    mock.expect_lock()
        .returning(|_, _| Ok(Bytes::from_static(b"/locks/reindex/2a")));
    {
        let unlock_calls = unlock_calls.clone();
        mock.expect_unlock().returning(move |_| {
            if unlock_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(StoreError::Unavailable("leader changed".to_string()))
            } else {
                Ok(())
            }
        });
    }
    mock.expect_revoke_lease().times(1).returning(|_| Ok(()));

    let shared: Arc<dyn CoordinationStore> = Arc::new(mock);
    let mut m = mutex(&shared).await;
    m.lock(WAIT).await.unwrap();

    let err = m.unlock(WAIT).await.unwrap_err();
    assert!(err.is_transient());
    assert!(m.is_locked());
    assert!(m.session().is_alive());

    m.unlock(WAIT).await.unwrap();
    assert!(!m.is_locked());
    assert!(!m.session().is_alive());
    assert_eq!(unlock_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_crashed_holder_releases_after_ttl() {
    let (_store, shared) = mem_store();
    let mut crashed = DistributedMutex::new(shared.clone(), LOCK, MutexOptions { ttl_secs: 2 })
        .await
        .unwrap();
    crashed.lock(WAIT).await.unwrap();
    drop(crashed);

    let mut next = mutex(&shared).await;
    next.lock(Duration::from_secs(10)).await.unwrap();
    assert!(next.is_locked());
}

#[test]
fn test_options_follow_lock_config() {
    let config = crate::LockConfig { session_ttl_secs: 15 };
    assert_eq!(MutexOptions::from(&config).ttl_secs, 15);
    assert_eq!(MutexOptions::default().ttl_secs, 60);
}
