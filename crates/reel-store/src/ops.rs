//! Mutations over an in-memory tracker document, shared by every adapter.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use reel_models::{NewRecord, TrackerDocument, Transition, VideoId, VideoRecord, VideoStatus};

use crate::error::{StoreError, StoreResult};
use crate::metrics;

/// A status change applied to a document but not yet persisted.
#[derive(Debug)]
pub(crate) struct Updated {
    record: VideoRecord,
    from: VideoStatus,
    operation: &'static str,
}

impl Updated {
    /// Report the change once the adapter has stored the document.
    pub(crate) fn committed(self) -> VideoRecord {
        metrics::record_transition(self.operation, self.record.status);
        info!(
            video_id = %self.record.video_id,
            from = %self.from,
            to = %self.record.status,
            operation = self.operation,
            "Updated status"
        );
        self.record
    }
}

/// Report a registration once the adapter has stored the document.
pub(crate) fn registered(record: VideoRecord) -> VideoId {
    metrics::record_registered(&record.language);
    info!(video_id = %record.video_id, title = %record.title, "Registered script");
    record.video_id
}

pub(crate) fn register(
    doc: &mut TrackerDocument,
    new: NewRecord,
    now: DateTime<Utc>,
) -> StoreResult<VideoRecord> {
    if new.story_id.trim().is_empty() {
        return Err(StoreError::invalid_field("story_id must not be empty"));
    }
    if new.language.trim().is_empty() {
        return Err(StoreError::invalid_field("language must not be empty"));
    }

    let video_id = new.video_id();
    if doc.records.contains_key(&video_id) {
        return Err(StoreError::duplicate(&video_id));
    }

    let record = VideoRecord::from_new(new, now);
    doc.records.insert(video_id, record.clone());
    Ok(record)
}

pub(crate) fn get(doc: &TrackerDocument, video_id: &VideoId) -> StoreResult<VideoRecord> {
    doc.records
        .get(video_id)
        .cloned()
        .ok_or_else(|| StoreError::not_found(video_id))
}

pub(crate) fn update(
    doc: &mut TrackerDocument,
    video_id: &VideoId,
    expected: Option<VideoStatus>,
    transition: Transition,
    now: DateTime<Utc>,
) -> StoreResult<Updated> {
    let record = doc
        .records
        .get_mut(video_id)
        .ok_or_else(|| StoreError::not_found(video_id))?;

    if let Some(expected) = expected {
        if record.status != expected {
            return Err(StoreError::StatusChanged {
                video_id: video_id.clone(),
                expected,
                actual: record.status,
            });
        }
    }

    let operation = transition.name();
    let from = record.status;
    if let Err(e) = record.apply(transition, now) {
        metrics::record_rejected(operation, from);
        warn!(video_id = %video_id, operation, "Rejected transition: {}", e);
        return Err(e.into());
    }

    Ok(Updated {
        record: record.clone(),
        from,
        operation,
    })
}

pub(crate) fn set_quality_score(
    doc: &mut TrackerDocument,
    video_id: &VideoId,
    score: f64,
    now: DateTime<Utc>,
) -> StoreResult<VideoRecord> {
    if !(0.0..=1.0).contains(&score) {
        return Err(StoreError::invalid_field(format!(
            "quality_score must be within [0, 1], got {}",
            score
        )));
    }

    let record = doc
        .records
        .get_mut(video_id)
        .ok_or_else(|| StoreError::not_found(video_id))?;
    record.quality_score = Some(score);
    record.touch(now);
    Ok(record.clone())
}
