//! Subscriber setup for the scheduler's `tracing` output.
//!
//! Worker and delivery threads are named (`cycle-worker-N`, `bridge-delivery`,
//! `cycle-scheduler`), so the installed formatter prints thread names: they
//! are the quickest way to tell which side of a barrier a line came from.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable: lifecycle and overrun
/// lines from this crate, nothing from dependencies.
pub const DEFAULT_LOG_DIRECTIVES: &str = "prometheus_cycle_scheduler=info";

/// `RUST_LOG` if it parses, otherwise `fallback`.
///
/// An unparsable `fallback` degrades to an empty filter rather than failing.
#[must_use]
pub fn log_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new(""))
}

/// Install a fmt subscriber filtered by [`DEFAULT_LOG_DIRECTIVES`].
///
/// `RUST_LOG=prometheus_cycle_scheduler=debug` shows every dispatched work
/// item. A no-op when a global subscriber is already installed.
pub fn init_tracing() {
    init_tracing_with(DEFAULT_LOG_DIRECTIVES);
}

/// Like [`init_tracing`] with caller-chosen fallback directives.
pub fn init_tracing_with(fallback: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(fallback))
        .with_thread_names(true)
        .try_init();
}
