//! Record store metrics collection.
//!
//! Counters go through the `metrics` facade and are no-ops unless the
//! embedding process installs a recorder.

use metrics::counter;
use reel_models::VideoStatus;

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Scripts registered, by language.
    pub const RECORDS_REGISTERED_TOTAL: &str = "reel_records_registered_total";

    /// Applied status transitions, by operation and target status.
    pub const TRANSITIONS_TOTAL: &str = "reel_transitions_total";

    /// Rejected status transitions, by operation and current status.
    pub const TRANSITIONS_REJECTED_TOTAL: &str = "reel_transitions_rejected_total";

    /// Full-document writes, by backend.
    pub const STORE_WRITES_TOTAL: &str = "reel_store_writes_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

pub fn record_registered(language: &str) {
    counter!(names::RECORDS_REGISTERED_TOTAL, "language" => language.to_string()).increment(1);
}

pub fn record_transition(operation: &'static str, to: VideoStatus) {
    counter!(
        names::TRANSITIONS_TOTAL,
        "operation" => operation,
        "to" => to.as_str()
    )
    .increment(1);
}

pub fn record_rejected(operation: &'static str, from: VideoStatus) {
    counter!(
        names::TRANSITIONS_REJECTED_TOTAL,
        "operation" => operation,
        "from" => from.as_str()
    )
    .increment(1);
}

pub fn record_write(backend: &'static str) {
    counter!(names::STORE_WRITES_TOTAL, "backend" => backend).increment(1);
}
