//! Record store error types.

use reel_models::{TransitionError, VideoId, VideoStatus};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Video not found: {0}")]
    NotFound(VideoId),

    #[error("Video already registered: {0}")]
    Duplicate(VideoId),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("Status of {video_id} changed: expected {expected}, found {actual}")]
    StatusChanged {
        video_id: VideoId,
        expected: VideoStatus,
        actual: VideoStatus,
    },

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Corrupt tracker document {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(video_id: &VideoId) -> Self {
        Self::NotFound(video_id.clone())
    }

    pub fn duplicate(video_id: &VideoId) -> Self {
        Self::Duplicate(video_id.clone())
    }

    pub fn invalid_field(msg: impl Into<String>) -> Self {
        Self::InvalidField(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate(_))
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, StoreError::InvalidTransition(_))
    }

    /// True if the failure came from storage rather than from the request.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            StoreError::Corrupt { .. }
                | StoreError::Persistence(_)
                | StoreError::Io(_)
                | StoreError::Json(_)
        )
    }

    /// True if the record moved on between snapshot and write.
    ///
    /// Batch and schedule loops skip these records instead of aborting.
    pub fn is_lost_race(&self) -> bool {
        matches!(
            self,
            StoreError::StatusChanged { .. }
                | StoreError::InvalidTransition(_)
                | StoreError::NotFound(_)
        )
    }
}
