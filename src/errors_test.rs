use std::time::Duration;

use super::*;

#[test]
fn test_store_unavailable_is_transient() {
    let err: Error = StoreError::Unavailable("no leader".to_string()).into();
    assert!(err.is_transient());
    assert_eq!(err.to_string(), "Store unavailable: no leader");
}

#[test]
fn test_timeout_is_transient() {
    let err = Error::timeout("register_service", Duration::from_millis(300));
    assert!(err.is_transient());
    assert_eq!(err.to_string(), "register_service timed out after 300ms");
}

#[test]
fn test_caller_errors_are_not_transient() {
    let errors: Vec<Error> = vec![
        Error::Closed,
        Error::InvalidService("name must be non-empty".to_string()),
        Error::Decode {
            key: "/ego/order/providers/grpc://a:1".to_string(),
            reason: "expected value".to_string(),
        },
        StoreError::LeaseNotFound(0x10).into(),
        StoreError::Compacted {
            requested: 3,
            compacted: 9,
        }
        .into(),
        LockError::NotHeld("/locks/a".to_string()).into(),
    ];

    for err in errors {
        assert!(!err.is_transient(), "{err} should not be transient");
    }
}

#[test]
fn test_lock_error_messages() {
    let err: Error = LockError::Timeout {
        name: "/locks/reindex".to_string(),
        duration: Duration::from_secs(1),
    }
    .into();
    assert_eq!(err.to_string(), "Lock /locks/reindex not acquired within 1s");
    assert_eq!(
        StoreError::LeaseNotFound(0x10).to_string(),
        "Lease 0x10 not found"
    );
}
