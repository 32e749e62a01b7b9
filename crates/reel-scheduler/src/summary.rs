//! Read-only production reporting.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use reel_models::{VideoId, VideoRecord, VideoStatus};
use reel_store::RecordStore;

use crate::batch::select_batch;
use crate::config::ProductionConfig;
use crate::error::{SchedulerError, SchedulerResult};
use crate::schedule::check_planning_days;

/// Default look-ahead for the upcoming schedule.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// A SCHEDULED record in the look-ahead window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingPublish {
    pub video_id: VideoId,
    pub language: String,
    pub title: String,
    pub publish_at: DateTime<Utc>,
}

/// Counts over one snapshot of the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionSummary {
    pub total_videos: usize,
    /// Every status, zero counts included
    pub by_status: BTreeMap<VideoStatus, usize>,
    /// Configured languages always present
    pub by_language: BTreeMap<String, usize>,
    pub next_batch_size: usize,
    pub next_batch: Vec<(String, usize)>,
    pub ready_to_publish: usize,
    pub eligible_to_publish: usize,
    pub window_days: u32,
    /// Sorted by publish time; overdue entries included
    pub upcoming: Vec<UpcomingPublish>,
    /// Upcoming entries per calendar date in the configured timezone
    pub scheduled_by_date: BTreeMap<NaiveDate, usize>,
}

impl ProductionSummary {
    /// Records currently in `status`.
    pub fn count(&self, status: VideoStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Counts records by status and language and previews upcoming work.
pub struct SummaryReporter {
    store: Arc<dyn RecordStore>,
    config: ProductionConfig,
    window_days: u32,
}

impl SummaryReporter {
    /// Reporter over `store` with the default look-ahead.
    pub fn new(store: Arc<dyn RecordStore>, config: ProductionConfig) -> Self {
        Self {
            store,
            config,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }

    /// Look-ahead for the upcoming schedule, at most `MAX_PLANNING_DAYS`.
    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    /// Summary of the store as of now.
    pub fn summary(&self) -> SchedulerResult<ProductionSummary> {
        self.summary_at(Utc::now())
    }

    /// Summary of the store as of `now`.
    ///
    /// Fails with `InvalidRequest` when the window is too long.
    pub fn summary_at(&self, now: DateTime<Utc>) -> SchedulerResult<ProductionSummary> {
        check_planning_days(self.window_days)?;
        let records = self.store.all()?;
        self.summarize(&records, now)
    }

    /// Production report as Markdown.
    pub fn render_report(&self) -> SchedulerResult<String> {
        let now = Utc::now();
        let summary = self.summary_at(now)?;
        Ok(render_markdown(&summary, &self.config, now))
    }

    fn summarize(
        &self,
        records: &[VideoRecord],
        now: DateTime<Utc>,
    ) -> SchedulerResult<ProductionSummary> {
        let offset = self.config.upload_schedule.utc_offset()?;
        let mut by_status: BTreeMap<VideoStatus, usize> =
            VideoStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let mut by_language: BTreeMap<String, usize> = self
            .config
            .languages_priority
            .iter()
            .map(|l| (l.clone(), 0))
            .collect();

        for record in records {
            *by_status.entry(record.status).or_default() += 1;
            *by_language.entry(record.language.clone()).or_default() += 1;
        }

        let batch = select_batch(records, self.config.batch_size, &self.config.languages_priority);

        let horizon = now
            .checked_add_signed(Duration::days(i64::from(self.window_days)))
            .ok_or_else(|| SchedulerError::invalid_request("look-ahead window out of range"))?;
        let mut upcoming: Vec<UpcomingPublish> = records
            .iter()
            .filter(|r| r.status == VideoStatus::Scheduled)
            .filter_map(|r| {
                let publish_at = r.scheduled_publish_time?;
                (publish_at <= horizon).then(|| UpcomingPublish {
                    video_id: r.video_id.clone(),
                    language: r.language.clone(),
                    title: r.title.clone(),
                    publish_at,
                })
            })
            .collect();
        upcoming.sort_by(|a, b| {
            a.publish_at
                .cmp(&b.publish_at)
                .then_with(|| a.video_id.cmp(&b.video_id))
        });

        let mut scheduled_by_date = BTreeMap::new();
        for entry in &upcoming {
            let local_date = entry.publish_at.with_timezone(&offset).date_naive();
            *scheduled_by_date.entry(local_date).or_default() += 1;
        }

        Ok(ProductionSummary {
            total_videos: records.len(),
            ready_to_publish: by_status
                .get(&VideoStatus::ReadyToPublish)
                .copied()
                .unwrap_or(0),
            eligible_to_publish: records
                .iter()
                .filter(|r| self.config.is_publish_eligible(r))
                .count(),
            by_status,
            by_language,
            next_batch_size: batch.total(),
            next_batch: batch.counts(),
            window_days: self.window_days,
            upcoming,
            scheduled_by_date,
        })
    }
}

/// Render `summary` as a Markdown production report.
pub fn render_markdown(
    summary: &ProductionSummary,
    config: &ProductionConfig,
    generated_at: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Video Production Report");
    let _ = writeln!(out);
    let _ = writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out);

    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out, "- Total videos: {}", summary.total_videos);
    let _ = writeln!(out, "- Ready to publish: {}", summary.ready_to_publish);
    let _ = writeln!(out, "- Eligible for scheduling: {}", summary.eligible_to_publish);
    let _ = writeln!(out, "- Next production batch: {}", summary.next_batch_size);
    let _ = writeln!(out);

    let _ = writeln!(out, "## Status Breakdown");
    let _ = writeln!(out, "| Status | Count |");
    let _ = writeln!(out, "|---|---|");
    for (status, count) in &summary.by_status {
        let _ = writeln!(out, "| {} | {} |", status.label(), count);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Language Breakdown");
    let _ = writeln!(out, "| Language | Count |");
    let _ = writeln!(out, "|---|---|");
    for (language, count) in &summary.by_language {
        let _ = writeln!(out, "| {} | {} |", language.to_uppercase(), count);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Next Production Batch");
    if summary.next_batch.is_empty() {
        let _ = writeln!(out, "No scripts ready for production.");
    } else {
        for (language, count) in &summary.next_batch {
            let _ = writeln!(out, "- {}: {}", language.to_uppercase(), count);
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Upcoming Schedule (next {} days)", summary.window_days);
    if summary.upcoming.is_empty() {
        let _ = writeln!(out, "Nothing scheduled.");
    } else {
        for entry in &summary.upcoming {
            let _ = writeln!(
                out,
                "- {} | {} | {} | {}",
                entry.publish_at.format("%Y-%m-%d %H:%M UTC"),
                entry.video_id,
                entry.language.to_uppercase(),
                entry.title
            );
        }
    }
    let _ = writeln!(out);

    let schedule = &config.upload_schedule;
    let _ = writeln!(out, "## Configuration");
    let _ = writeln!(out, "- Batch size: {}", config.batch_size);
    let _ = writeln!(out, "- Languages: {}", config.languages_priority.join(", "));
    let _ = writeln!(out, "- Daily upload limit: {}", config.daily_upload_limit);
    let _ = writeln!(
        out,
        "- Upload window: {:02}:00-{:02}:00 {}",
        schedule.start_hour, schedule.end_hour, schedule.timezone
    );
    let _ = writeln!(
        out,
        "- Duration bounds: {}-{}s",
        config.quality_thresholds.min_duration, config.quality_thresholds.max_duration
    );

    out
}
