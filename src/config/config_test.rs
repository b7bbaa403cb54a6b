use serial_test::serial;
use temp_env::with_vars;

use super::*;
use crate::Error;

fn cleanup_all_registry_env_vars() {
    for (key, _) in std::env::vars() {
        if key.starts_with("REGISTRY__") || key == CONFIG_PATH_ENV {
            std::env::remove_var(&key);
        }
    }
}

#[test]
#[serial]
fn default_config_should_initialize_with_hardcoded_values() {
    let settings = RegistrySettings::default();

    assert_eq!(settings.store.endpoints, vec!["http://127.0.0.1:2379".to_string()]);
    assert_eq!(settings.registry.prefix, "ego");
    assert_eq!(settings.registry.service_ttl_secs, 60);
    assert_eq!(settings.registry.max_txn_ops, 128);
    assert_eq!(settings.watch.event_buffer_size, 100);
    assert_eq!(settings.watch.directory_buffer_size, 10);
    assert_eq!(settings.lock.session_ttl_secs, 60);
    assert!(settings.validate().is_ok());
}

#[test]
#[serial]
fn new_should_merge_environment_overrides() {
    cleanup_all_registry_env_vars();
    with_vars(
        vec![
            ("REGISTRY__REGISTRY__PREFIX", Some("mesh")),
            ("REGISTRY__WATCH__EVENT_BUFFER_SIZE", Some("256")),
        ],
        || {
            let settings = RegistrySettings::new().unwrap();

            assert_eq!(settings.registry.prefix, "mesh");
            assert_eq!(settings.watch.event_buffer_size, 256);
            // Untouched sections keep their defaults
            assert_eq!(settings.lock.session_ttl_secs, 60);
        },
    );
}

#[test]
#[serial]
fn new_should_parse_endpoint_list_from_environment() {
    cleanup_all_registry_env_vars();
    with_vars(
        vec![(
            "REGISTRY__STORE__ENDPOINTS",
            Some("http://10.0.0.1:2379,http://10.0.0.2:2379"),
        )],
        || {
            let settings = RegistrySettings::new().unwrap();

            assert_eq!(
                settings.store.endpoints,
                vec![
                    "http://10.0.0.1:2379".to_string(),
                    "http://10.0.0.2:2379".to_string()
                ]
            );
        },
    );
}

#[test]
#[serial]
fn with_override_config_should_merge_file_settings() {
    cleanup_all_registry_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("registry.toml");

    std::fs::write(
        &config_path,
        r#"
        [registry]
        prefix = "staging"
        service_ttl_secs = 15

        [watch.reconnect]
        base_delay_ms = 20
        max_delay_ms = 400
        "#,
    )
    .unwrap();

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let settings = RegistrySettings::default()
            .with_override_config(config_path.to_str().unwrap())
            .unwrap()
            .validate()
            .unwrap();

        assert_eq!(settings.registry.prefix, "staging");
        assert_eq!(settings.registry.service_ttl_secs, 15);
        assert_eq!(settings.watch.reconnect.base_delay_ms, 20);
        assert_eq!(settings.watch.reconnect.max_delay_ms, 400);
        // Fields absent from the file keep their previous values
        assert_eq!(settings.registry.write_timeout_ms, 3000);
    });
}

#[test]
#[serial]
fn config_path_env_should_be_loaded_by_new() {
    cleanup_all_registry_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("from_env.toml");
    std::fs::write(
        &config_path,
        r#"
        [lock]
        session_ttl_secs = 5
        "#,
    )
    .unwrap();

    with_vars(vec![(CONFIG_PATH_ENV, Some(config_path.to_str().unwrap()))], || {
        let settings = RegistrySettings::new().unwrap();
        assert_eq!(settings.lock.session_ttl_secs, 5);
    });
}

#[test]
#[serial]
fn validate_should_reject_empty_endpoints() {
    let mut settings = RegistrySettings::default();
    settings.store.endpoints.clear();

    let err = settings.validate().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("endpoints"));
}

#[test]
#[serial]
fn store_section_should_only_carry_endpoints() {
    cleanup_all_registry_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("store.toml");
    std::fs::write(
        &config_path,
        r#"
        [store]
        endpoints = ["http://10.0.0.1:2379", "http://10.0.0.2:2379"]

        [registry]
        read_timeout_ms = 750
        "#,
    )
    .unwrap();

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let settings = RegistrySettings::default()
            .with_override_config(config_path.to_str().unwrap())
            .unwrap()
            .validate()
            .unwrap();

        assert_eq!(settings.store.endpoints.len(), 2);
        assert_eq!(settings.registry.read_timeout(), std::time::Duration::from_millis(750));
    });

    let mut settings = RegistrySettings::default();
    settings.store.endpoints.push("  ".to_string());
    assert!(matches!(settings.validate().unwrap_err(), Error::Config(_)));
}

#[test]
fn validate_should_reject_blank_prefix() {
    let mut settings = RegistrySettings::default();
    settings.registry.prefix = "//".to_string();
    assert!(settings.validate().is_err());
}

#[test]
fn validate_should_reject_zero_buffers() {
    let mut settings = RegistrySettings::default();
    settings.watch.event_buffer_size = 0;
    assert!(settings.validate().is_err());

    let mut settings = RegistrySettings::default();
    settings.watch.directory_buffer_size = 0;
    assert!(settings.validate().is_err());
}

#[test]
fn validate_should_reject_txn_ceiling_above_store_limit() {
    let mut settings = RegistrySettings::default();
    settings.registry.max_txn_ops = 129;
    assert!(settings.validate().is_err());

    let mut settings = RegistrySettings::default();
    settings.registry.max_txn_ops = 0;
    assert!(settings.validate().is_err());
}

#[test]
fn validate_should_reject_inverted_backoff_bounds() {
    let mut settings = RegistrySettings::default();
    settings.watch.reconnect.base_delay_ms = 1000;
    settings.watch.reconnect.max_delay_ms = 10;
    assert!(settings.validate().is_err());
}

#[test]
fn backoff_delay_should_grow_and_cap() {
    let policy = BackoffPolicy {
        base_delay_ms: 10,
        max_delay_ms: 100,
        jitter_ratio: 0.0,
    };

    assert_eq!(policy.delay(0).as_millis(), 10);
    assert_eq!(policy.delay(1).as_millis(), 20);
    assert_eq!(policy.delay(3).as_millis(), 80);
    assert_eq!(policy.delay(4).as_millis(), 100);
    assert_eq!(policy.delay(63).as_millis(), 100);
}

#[test]
fn backoff_jitter_should_stay_within_spread() {
    let policy = BackoffPolicy {
        base_delay_ms: 100,
        max_delay_ms: 100,
        jitter_ratio: 0.5,
    };

    for attempt in 0..50 {
        let delay = policy.delay(attempt).as_millis();
        assert!((75..=125).contains(&delay), "delay {delay} out of jitter range");
    }
}

#[test]
fn registry_prefix_should_be_normalized() {
    let config = RegistryConfig {
        prefix: "/ego/".to_string(),
        ..Default::default()
    };
    assert_eq!(config.normalized_prefix(), "ego");
}
