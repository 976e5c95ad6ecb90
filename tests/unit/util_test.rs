//! Tests for utility helpers

use prometheus_cycle_scheduler::util::{
    init_tracing, init_tracing_with, log_filter, now_ms, DEFAULT_LOG_DIRECTIVES,
};

#[test]
fn test_now_ms_is_epoch_millis() {
    // 2020-01-01T00:00:00Z
    assert!(now_ms() > 1_577_836_800_000);
}

#[test]
fn test_init_tracing_is_repeatable() {
    init_tracing();
    init_tracing();
    init_tracing_with("prometheus_cycle_scheduler=trace");
    tracing::info!("tracing initialised twice without panicking");
}

#[test]
fn test_log_filter_defaults_to_crate_directives() {
    // RUST_LOG takes precedence; only the fallback path is checked here
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    assert_eq!(
        log_filter(DEFAULT_LOG_DIRECTIVES).to_string(),
        "prometheus_cycle_scheduler=info"
    );
    // Unparsable fallback must not panic
    let _ = log_filter("prometheus_cycle_scheduler=loud");
}
