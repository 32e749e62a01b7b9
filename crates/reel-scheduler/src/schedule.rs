//! Publish calendar and slot assignment.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, info};

use reel_models::{Transition, VideoId, VideoRecord, VideoStatus};
use reel_store::RecordStore;

use crate::config::ProductionConfig;
use crate::error::{SchedulerError, SchedulerResult};
use crate::logging::RecordLogger;
use crate::outcome::{PublishOutcome, ScheduleOutcome, ScheduledVideo, SkippedRecord};

/// A candidate publish time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishSlot {
    pub publish_at: DateTime<Utc>,
    /// Calendar date in the configured timezone
    pub date: NaiveDate,
    /// 1-based position within the day
    pub slot_number: u32,
    pub assigned_video: Option<VideoId>,
}

/// A slot paired with the record placed in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotAssignment {
    pub slot: PublishSlot,
    pub record: VideoRecord,
}

/// Longest look-ahead, in days, accepted for planning and reporting.
pub const MAX_PLANNING_DAYS: u32 = 366;

/// Reject a look-ahead longer than [`MAX_PLANNING_DAYS`].
pub(crate) fn check_planning_days(days: u32) -> SchedulerResult<()> {
    if days > MAX_PLANNING_DAYS {
        return Err(SchedulerError::invalid_request(format!(
            "look-ahead of {} days exceeds the maximum of {}",
            days, MAX_PLANNING_DAYS
        )));
    }
    Ok(())
}

/// Slots for each publishing day in `[start, start + days)`.
///
/// Hours are wall-clock in the configured offset; `daily_upload_limit` slots
/// are spaced `max(1, window / limit)` hours apart and any landing on or past
/// `end_hour` are dropped.
pub fn generate_slots(
    config: &ProductionConfig,
    start: NaiveDate,
    days: u32,
) -> SchedulerResult<Vec<PublishSlot>> {
    check_planning_days(days)?;
    let schedule = &config.upload_schedule;
    let limit = config.daily_upload_limit;
    if limit == 0 {
        return Err(SchedulerError::config("daily_upload_limit must be at least 1"));
    }
    if schedule.start_hour >= schedule.end_hour {
        return Err(SchedulerError::config("start_hour must be before end_hour"));
    }
    let offset = schedule.utc_offset()?;
    let interval = ((schedule.end_hour - schedule.start_hour) / limit).max(1);

    let mut slots = Vec::new();
    for day in 0..days {
        let Some(date) = start.checked_add_days(Days::new(u64::from(day))) else {
            break;
        };
        if !schedule.publishes_on(date.weekday().number_from_monday()) {
            continue;
        }

        for k in 0..limit {
            let hour = schedule.start_hour + k * interval;
            if hour >= schedule.end_hour {
                break;
            }
            let local = date
                .and_hms_opt(hour, 0, 0)
                .ok_or_else(|| SchedulerError::config(format!("invalid slot hour {}", hour)))?;
            let publish_at = offset
                .from_local_datetime(&local)
                .single()
                .ok_or_else(|| SchedulerError::config(format!("ambiguous slot time {}", local)))?
                .with_timezone(&Utc);

            slots.push(PublishSlot {
                publish_at,
                date,
                slot_number: k + 1,
                assigned_video: None,
            });
        }
    }

    Ok(slots)
}

/// Higher quality first, then oldest, then by ID.
fn priority_order(a: &VideoRecord, b: &VideoRecord) -> Ordering {
    let qa = a.quality_score.unwrap_or(0.0);
    let qb = b.quality_score.unwrap_or(0.0);
    qb.total_cmp(&qa)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.video_id.cmp(&b.video_id))
}

/// Builds the publish calendar and assigns eligible records to it.
pub struct PublishScheduler {
    store: Arc<dyn RecordStore>,
    config: ProductionConfig,
}

impl PublishScheduler {
    /// Fails with a config error if the schedule settings are unusable.
    pub fn new(store: Arc<dyn RecordStore>, config: ProductionConfig) -> SchedulerResult<Self> {
        config.validate_all()?;
        Ok(Self { store, config })
    }

    /// Validated configuration in use.
    pub fn config(&self) -> &ProductionConfig {
        &self.config
    }

    /// Slots starting from today in the configured timezone.
    pub fn generate_publishing_slots(&self, days: u32) -> SchedulerResult<Vec<PublishSlot>> {
        self.generate_publishing_slots_from(self.today(Utc::now())?, days)
    }

    /// Slots starting from `start`.
    pub fn generate_publishing_slots_from(
        &self,
        start: NaiveDate,
        days: u32,
    ) -> SchedulerResult<Vec<PublishSlot>> {
        generate_slots(&self.config, start, days)
    }

    /// READY_TO_PUBLISH and within the quality thresholds.
    pub fn is_eligible(&self, record: &VideoRecord) -> bool {
        self.config.is_publish_eligible(record)
    }

    /// Pair eligible records with slots, best record into earliest slot.
    ///
    /// Ineligible records are ignored; pairing stops when either side runs
    /// out.
    pub fn assign_videos_to_slots(
        &self,
        records: &[VideoRecord],
        slots: &[PublishSlot],
    ) -> Vec<SlotAssignment> {
        let mut eligible: Vec<&VideoRecord> = records
            .iter()
            .filter(|r| {
                let ok = self.is_eligible(r);
                if !ok && r.status == VideoStatus::ReadyToPublish {
                    if let Some(reason) = self.config.quality_thresholds.rejection(r) {
                        debug!(
                            video_id = %r.video_id,
                            reason = %reason,
                            "Not eligible for publishing"
                        );
                    }
                }
                ok
            })
            .collect();
        eligible.sort_by(|a, b| priority_order(a, b));

        let mut slots: Vec<&PublishSlot> = slots.iter().collect();
        slots.sort_by_key(|s| s.publish_at);

        eligible
            .into_iter()
            .zip(slots)
            .map(|(record, slot)| {
                let mut slot = slot.clone();
                slot.assigned_video = Some(record.video_id.clone());
                SlotAssignment {
                    slot,
                    record: record.clone(),
                }
            })
            .collect()
    }

    /// Schedule from the current time; `true` iff anything was scheduled.
    pub fn auto_schedule_videos(&self, days: u32) -> SchedulerResult<bool> {
        Ok(self.auto_schedule_videos_at(Utc::now(), days)?.any_scheduled())
    }

    /// Assign and persist, treating `now` as the current instant.
    ///
    /// Past slots and slots already held by a SCHEDULED record are not
    /// offered. A record that left READY_TO_PUBLISH since the snapshot is
    /// skipped; storage failures propagate.
    pub fn auto_schedule_videos_at(
        &self,
        now: DateTime<Utc>,
        days: u32,
    ) -> SchedulerResult<ScheduleOutcome> {
        let (plan, eligible) = self.plan_at(now, days)?;
        let mut outcome = ScheduleOutcome {
            unplaced: eligible.saturating_sub(plan.len()),
            ..Default::default()
        };

        if plan.is_empty() {
            info!(eligible, "Nothing to schedule");
            return Ok(outcome);
        }

        for assignment in plan {
            let video_id = &assignment.record.video_id;
            let publish_at = assignment.slot.publish_at;
            let logger = RecordLogger::new(video_id, "schedule");
            let _span = logger.create_span().entered();

            match self.store.update_expecting(
                video_id,
                VideoStatus::ReadyToPublish,
                Transition::schedule(publish_at),
            ) {
                Ok(_) => {
                    let when = publish_at.format("%Y-%m-%d %H:%M UTC");
                    logger.log_applied(&format!("scheduled for {}", when));
                    outcome.scheduled.push(ScheduledVideo {
                        video_id: video_id.clone(),
                        publish_at,
                    });
                }
                Err(e) if e.is_lost_race() => {
                    logger.log_skipped(&e.to_string());
                    outcome.skipped.push(SkippedRecord::new(video_id.clone(), e.to_string()));
                }
                Err(e) => {
                    logger.log_error(&e.to_string());
                    return Err(e.into());
                }
            }
        }

        info!(
            scheduled = outcome.scheduled.len(),
            skipped = outcome.skipped.len(),
            unplaced = outcome.unplaced,
            "Auto-schedule complete"
        );
        Ok(outcome)
    }

    /// Assignments `auto_schedule_videos` would make now, without writing.
    pub fn publishing_queue(&self, days: u32) -> SchedulerResult<Vec<SlotAssignment>> {
        self.publishing_queue_at(Utc::now(), days)
    }

    /// [`Self::publishing_queue`] as of `now`.
    pub fn publishing_queue_at(
        &self,
        now: DateTime<Utc>,
        days: u32,
    ) -> SchedulerResult<Vec<SlotAssignment>> {
        Ok(self.plan_at(now, days)?.0)
    }

    /// Return a SCHEDULED record to the publish queue.
    pub fn reschedule(
        &self,
        video_id: &VideoId,
        reason: Option<String>,
    ) -> SchedulerResult<VideoRecord> {
        let record = self.store.update_expecting(
            video_id,
            VideoStatus::Scheduled,
            Transition::Rescheduled { reason },
        )?;
        info!(video_id = %video_id, "Returned to publish queue");
        Ok(record)
    }

    /// Mark targets PUBLISHED at the current time.
    ///
    /// A target containing `_` is a video ID; anything else is a story ID and
    /// expands to that story in every configured language. A YouTube ID may
    /// only be given when the targets resolve to a single video.
    pub fn mark_published(
        &self,
        targets: &[String],
        youtube_video_id: Option<&str>,
    ) -> SchedulerResult<PublishOutcome> {
        let ids = self.expand_targets(targets);
        if youtube_video_id.is_some() && ids.len() != 1 {
            return Err(SchedulerError::invalid_request(format!(
                "a YouTube ID needs exactly one target video, got {}",
                ids.len()
            )));
        }

        let mut outcome = PublishOutcome::default();
        let now = Utc::now();
        for video_id in ids {
            let logger = RecordLogger::new(&video_id, "publish");
            let transition = Transition::Published {
                youtube_video_id: youtube_video_id.map(str::to_string),
                published_at: Some(now),
            };

            match self.store.update(&video_id, transition) {
                Ok(_) => {
                    logger.log_applied("published");
                    outcome.published.push(video_id);
                }
                Err(e) if e.is_not_found() => {
                    logger.log_skipped("unknown video");
                    outcome.not_found.push(video_id);
                }
                Err(e) if e.is_invalid_transition() => {
                    let current = self.store.get(&video_id)?;
                    if current.status == VideoStatus::Published {
                        logger.log_skipped("already published");
                        outcome.already_published.push(video_id);
                    } else {
                        logger.log_skipped(&e.to_string());
                        outcome.rejected.push(SkippedRecord::new(video_id, e.to_string()));
                    }
                }
                Err(e) => {
                    logger.log_error(&e.to_string());
                    return Err(e.into());
                }
            }
        }

        Ok(outcome)
    }

    fn expand_targets(&self, targets: &[String]) -> Vec<VideoId> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for target in targets {
            let target = target.trim();
            if target.is_empty() {
                continue;
            }
            let expanded: Vec<VideoId> = if target.contains('_') {
                vec![VideoId::from(target)]
            } else {
                self.config
                    .languages_priority
                    .iter()
                    .map(|lang| VideoId::for_story(target, lang))
                    .collect()
            };
            for id in expanded {
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    fn today(&self, now: DateTime<Utc>) -> SchedulerResult<NaiveDate> {
        let offset = self.config.upload_schedule.utc_offset()?;
        Ok(now.with_timezone(&offset).date_naive())
    }

    /// Open future slots paired with eligible records, plus the eligible count.
    fn plan_at(
        &self,
        now: DateTime<Utc>,
        days: u32,
    ) -> SchedulerResult<(Vec<SlotAssignment>, usize)> {
        let snapshot = self.store.all()?;
        let eligible = snapshot.iter().filter(|r| self.is_eligible(r)).count();
        if eligible == 0 {
            return Ok((Vec::new(), 0));
        }

        let taken: HashSet<DateTime<Utc>> = snapshot
            .iter()
            .filter(|r| r.status == VideoStatus::Scheduled)
            .filter_map(|r| r.scheduled_publish_time)
            .collect();

        let slots: Vec<PublishSlot> = generate_slots(&self.config, self.today(now)?, days)?
            .into_iter()
            .filter(|s| s.publish_at > now && !taken.contains(&s.publish_at))
            .collect();
        debug!(eligible, open_slots = slots.len(), days, "Planning publish calendar");

        Ok((self.assign_videos_to_slots(&snapshot, &slots), eligible))
    }
}
