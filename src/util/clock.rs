//! Wall-clock helpers.

use std::time::{SystemTime, UNIX_EPOCH};

/// Cycle timestamp in milliseconds since the Unix epoch.
pub type Timestamp = u128;

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Returns 0 if the system clock is set before the epoch.
#[must_use]
pub fn now_ms() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
