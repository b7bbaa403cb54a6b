use super::*;

fn create_test_registry() -> (Registry, RegistryMetrics) {
    let registry = Registry::new_custom(Some("dregistry".to_string()), None).unwrap();
    let metrics = RegistryMetrics::new(&registry).unwrap();
    (registry, metrics)
}

#[test]
fn test_custom_registry() {
    let (registry, metrics) = create_test_registry();

    metrics.watch_events_dropped.with_label_values(&["/ego/order/"]).inc();
    metrics.decode_failures.with_label_values(&[DECODE_SOURCE_LIST]).inc();
    let families = registry.gather();
    assert!(!families.is_empty());

    let metric_names: Vec<_> = families.iter().map(|m| m.get_name()).collect();
    assert!(
        metric_names.contains(&"dregistry_watch_events_dropped_total"),
        "Missing dregistry_watch_events_dropped_total"
    );
    assert!(
        metric_names.contains(&"dregistry_decode_failures_total"),
        "Missing dregistry_decode_failures_total"
    );
}

#[test]
fn test_counter_increment() {
    let (_registry, metrics) = create_test_registry();

    metrics.watch_reconnects.with_label_values(&["/a/"]).inc();
    metrics.watch_reconnects.with_label_values(&["/a/"]).inc();
    metrics.watch_reconnects.with_label_values(&["/b/"]).inc();

    assert_eq!(metrics.watch_reconnects.with_label_values(&["/a/"]).get(), 2);
    assert_eq!(metrics.watch_reconnects.with_label_values(&["/b/"]).get(), 1);
}

#[test]
fn test_duplicate_registration_is_rejected() {
    let (registry, _metrics) = create_test_registry();
    assert!(RegistryMetrics::new(&registry).is_err());
}

#[test]
fn test_independent_registries_do_not_collide() {
    let (_r1, m1) = create_test_registry();
    let (_r2, m2) = create_test_registry();

    m1.registered_keys.set(3);
    assert_eq!(m2.registered_keys.get(), 0);
}

#[test]
fn test_encode_text() {
    let (registry, metrics) = create_test_registry();
    metrics.registered_keys.set(2);

    let text = encode_text(&registry).unwrap();
    assert!(text.contains("dregistry_registered_keys 2"));
}
