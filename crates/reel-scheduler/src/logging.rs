//! Structured per-record logging for batch and schedule loops.

use tracing::{error, info, warn, Span};

use reel_models::VideoId;

/// Logger carrying the record and operation as structured fields.
#[derive(Debug, Clone)]
pub struct RecordLogger {
    video_id: String,
    operation: String,
}

impl RecordLogger {
    pub fn new(video_id: &VideoId, operation: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            operation: operation.to_string(),
        }
    }

    /// A record the loop changed.
    pub fn log_applied(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Record updated: {}", message
        );
    }

    /// A record the loop gave up on; the loop carries on.
    pub fn log_skipped(&self, reason: &str) {
        warn!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Record skipped: {}", reason
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Record error: {}", message
        );
    }

    /// Span carrying the record fields, entered around one record's work.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "record",
            video_id = %self.video_id,
            operation = %self.operation
        )
    }
}
