//! Results of the bulk operations.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use reel_models::VideoId;

/// A record a bulk operation left alone, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    pub video_id: VideoId,
    pub reason: String,
}

impl SkippedRecord {
    pub fn new(video_id: VideoId, reason: impl Into<String>) -> Self {
        Self {
            video_id,
            reason: reason.into(),
        }
    }
}

/// Result of moving a production batch into IN_PRODUCTION.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    pub marked: Vec<VideoId>,
    pub skipped: Vec<SkippedRecord>,
}

impl BatchOutcome {
    pub fn new(batch_id: Uuid) -> Self {
        Self {
            batch_id,
            marked: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// One record placed into one publish slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledVideo {
    pub video_id: VideoId,
    pub publish_at: DateTime<Utc>,
}

/// Result of an auto-schedule pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScheduleOutcome {
    pub scheduled: Vec<ScheduledVideo>,
    pub skipped: Vec<SkippedRecord>,
    /// Eligible records left without a slot
    pub unplaced: usize,
}

impl ScheduleOutcome {
    pub fn any_scheduled(&self) -> bool {
        !self.scheduled.is_empty()
    }
}

/// Result of marking a list of targets as published.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublishOutcome {
    pub published: Vec<VideoId>,
    pub already_published: Vec<VideoId>,
    pub not_found: Vec<VideoId>,
    pub rejected: Vec<SkippedRecord>,
}

impl PublishOutcome {
    pub fn any_published(&self) -> bool {
        !self.published.is_empty()
    }
}
