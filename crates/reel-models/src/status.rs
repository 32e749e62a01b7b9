//! Video lifecycle status and the legal transition table.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Video production status.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
    Default,
)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Script translated and registered, waiting for production
    #[default]
    ScriptReady,
    /// Picked up by a production batch
    InProduction,
    /// Rendered video file is available
    VideoReady,
    /// Video is ready but the thumbnail is still missing
    ThumbnailNeeded,
    /// All assets are present
    ReadyToPublish,
    /// Assigned a publish slot
    Scheduled,
    /// Live on the channel
    Published,
    /// Production or upload failed
    Failed,
}

impl VideoStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [VideoStatus; 8] = [
        VideoStatus::ScriptReady,
        VideoStatus::InProduction,
        VideoStatus::VideoReady,
        VideoStatus::ThumbnailNeeded,
        VideoStatus::ReadyToPublish,
        VideoStatus::Scheduled,
        VideoStatus::Published,
        VideoStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::ScriptReady => "script_ready",
            VideoStatus::InProduction => "in_production",
            VideoStatus::VideoReady => "video_ready",
            VideoStatus::ThumbnailNeeded => "thumbnail_needed",
            VideoStatus::ReadyToPublish => "ready_to_publish",
            VideoStatus::Scheduled => "scheduled",
            VideoStatus::Published => "published",
            VideoStatus::Failed => "failed",
        }
    }

    /// Human-readable label ("Ready To Publish").
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Statuses reachable from `self` in one step.
    ///
    /// Terminal states return an empty slice.
    pub fn allowed_transitions(&self) -> &'static [VideoStatus] {
        use VideoStatus::*;
        match self {
            ScriptReady => &[InProduction, Failed],
            InProduction => &[VideoReady, Failed],
            VideoReady => &[ThumbnailNeeded, ReadyToPublish, Failed],
            ThumbnailNeeded => &[ReadyToPublish, Failed],
            ReadyToPublish => &[Scheduled, Failed],
            // ReadyToPublish here is the reschedule edge
            Scheduled => &[Published, ReadyToPublish, Failed],
            Published | Failed => &[],
        }
    }

    /// Check whether the edge `self -> next` is in the table.
    pub fn can_transition_to(&self, next: VideoStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Validate the edge `self -> next`.
    pub fn validate_transition(&self, next: VideoStatus) -> Result<(), TransitionError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(TransitionError { from: *self, to: next })
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Published | VideoStatus::Failed)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a status string does not name a status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Unknown status '{0}' (expected one of: script_ready, in_production, video_ready, \
     thumbnail_needed, ready_to_publish, scheduled, published, failed)"
)]
pub struct ParseStatusError(pub String);

impl FromStr for VideoStatus {
    type Err = ParseStatusError;

    /// Accepts the canonical name case-insensitively, with `-` or `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        VideoStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// A status edge that is not in the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: VideoStatus,
    pub to: VideoStatus,
}
