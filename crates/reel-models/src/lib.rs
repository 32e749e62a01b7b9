//! Shared data models for the StoryReel video lifecycle tracker.
//!
//! This crate provides Serde-serializable types for:
//! - Video records keyed by `{story_id}_{language}`
//! - The closed set of lifecycle statuses and their legal edges
//! - Per-edge transitions carrying only the fields legal for that edge
//! - The persisted tracker document and its JSON schema

pub mod asset;
pub mod status;
pub mod timestamp;
pub mod transition;
pub mod video;

// Re-export common types
pub use asset::AssetKind;
pub use status::{ParseStatusError, TransitionError, VideoStatus};
pub use transition::Transition;
pub use video::{NewRecord, TrackerDocument, VideoId, VideoRecord};
