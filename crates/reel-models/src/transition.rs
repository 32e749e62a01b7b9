//! Per-edge status transitions.
//!
//! Each variant names one edge of the status machine and carries only the
//! fields that edge is allowed to touch. Publishing metadata, for example,
//! can only be written through [`Transition::Published`].

use chrono::{DateTime, Utc};

use crate::status::{TransitionError, VideoStatus};

/// A requested status change plus its edge-specific fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// SCRIPT_READY -> IN_PRODUCTION
    InProduction { note: Option<String> },
    /// IN_PRODUCTION -> VIDEO_READY
    VideoReady {
        video_path: Option<String>,
        duration_seconds: Option<u32>,
        file_size_mb: Option<f64>,
    },
    /// VIDEO_READY -> THUMBNAIL_NEEDED
    ThumbnailNeeded { thumbnail_path: Option<String> },
    /// VIDEO_READY | THUMBNAIL_NEEDED -> READY_TO_PUBLISH
    ReadyToPublish { thumbnail_path: Option<String> },
    /// READY_TO_PUBLISH -> SCHEDULED
    Scheduled { publish_at: DateTime<Utc> },
    /// SCHEDULED -> READY_TO_PUBLISH, and only from SCHEDULED
    Rescheduled { reason: Option<String> },
    /// SCHEDULED -> PUBLISHED
    Published {
        youtube_video_id: Option<String>,
        published_at: Option<DateTime<Utc>>,
    },
    /// any non-terminal -> FAILED
    Failed { reason: String },
}

impl Transition {
    /// Start production, recording `note` (usually the batch ID).
    pub fn mark_in_production(note: impl Into<String>) -> Self {
        Self::InProduction { note: Some(note.into()) }
    }

    /// Rendered video is available at `video_path`.
    pub fn mark_video_ready(
        video_path: impl Into<String>,
        duration_seconds: Option<u32>,
        file_size_mb: Option<f64>,
    ) -> Self {
        Self::VideoReady {
            video_path: Some(video_path.into()),
            duration_seconds,
            file_size_mb,
        }
    }

    /// All assets present; `thumbnail_path` completes the set.
    pub fn mark_ready_to_publish(thumbnail_path: impl Into<String>) -> Self {
        Self::ReadyToPublish { thumbnail_path: Some(thumbnail_path.into()) }
    }

    /// Assign the publish slot at `publish_at`.
    pub fn schedule(publish_at: DateTime<Utc>) -> Self {
        Self::Scheduled { publish_at }
    }

    /// Record the upload as live.
    pub fn publish(youtube_video_id: impl Into<String>, published_at: DateTime<Utc>) -> Self {
        Self::Published {
            youtube_video_id: Some(youtube_video_id.into()),
            published_at: Some(published_at),
        }
    }

    /// Move to FAILED with `reason` appended to the notes.
    pub fn fail(reason: impl Into<String>) -> Self {
        Self::Failed { reason: reason.into() }
    }

    /// Status the record holds after this transition.
    pub fn target(&self) -> VideoStatus {
        match self {
            Transition::InProduction { .. } => VideoStatus::InProduction,
            Transition::VideoReady { .. } => VideoStatus::VideoReady,
            Transition::ThumbnailNeeded { .. } => VideoStatus::ThumbnailNeeded,
            Transition::ReadyToPublish { .. } | Transition::Rescheduled { .. } => {
                VideoStatus::ReadyToPublish
            }
            Transition::Scheduled { .. } => VideoStatus::Scheduled,
            Transition::Published { .. } => VideoStatus::Published,
            Transition::Failed { .. } => VideoStatus::Failed,
        }
    }

    /// Operation name used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Transition::InProduction { .. } => "mark_in_production",
            Transition::VideoReady { .. } => "mark_video_ready",
            Transition::ThumbnailNeeded { .. } => "request_thumbnail",
            Transition::ReadyToPublish { .. } => "mark_ready_to_publish",
            Transition::Scheduled { .. } => "schedule",
            Transition::Rescheduled { .. } => "reschedule",
            Transition::Published { .. } => "publish",
            Transition::Failed { .. } => "fail",
        }
    }

    /// Check that this transition may be applied to a record in `from`.
    pub fn validate_from(&self, from: VideoStatus) -> Result<(), TransitionError> {
        let to = self.target();
        from.validate_transition(to)?;
        let edge_ok = match self {
            Transition::Rescheduled { .. } => from == VideoStatus::Scheduled,
            Transition::ReadyToPublish { .. } => from != VideoStatus::Scheduled,
            _ => true,
        };
        if !edge_ok {
            return Err(TransitionError { from, to });
        }
        Ok(())
    }
}
