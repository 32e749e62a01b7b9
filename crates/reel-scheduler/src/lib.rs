//! Production scheduling for tracked videos.
//!
//! This crate provides:
//! - Production configuration loading and validation
//! - Production batch selection under per-language quotas
//! - Publish slot generation and priority-ordered slot assignment
//! - Read-only summaries and the Markdown production report
//!
//! Every component takes its `RecordStore` at construction.

pub mod batch;
pub mod config;
pub mod error;
pub mod logging;
pub mod outcome;
pub mod schedule;
pub mod summary;

pub use batch::{select_batch, BatchSelector, LanguageBatch, ProductionBatch};
pub use crate::config::{ProductionConfig, QualityThresholds, UploadSchedule, DEFAULT_CONFIG_PATH};
pub use error::{SchedulerError, SchedulerResult};
pub use logging::RecordLogger;
pub use outcome::{BatchOutcome, PublishOutcome, ScheduleOutcome, ScheduledVideo, SkippedRecord};
pub use schedule::{
    generate_slots, PublishScheduler, PublishSlot, SlotAssignment, MAX_PLANNING_DAYS,
};
pub use summary::{render_markdown, ProductionSummary, SummaryReporter, UpcomingPublish};
