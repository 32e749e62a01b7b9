//! The record store port.

use reel_models::{NewRecord, Transition, VideoId, VideoRecord, VideoStatus};

use crate::error::StoreResult;

/// Durable repository of video records and the sole mutation gateway.
///
/// Every write is a full read-modify-write of the record set. Adapters are
/// injected into the selector, scheduler and reporter at construction.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait RecordStore: Send + Sync {
    /// Create a SCRIPT_READY record; fails with `Duplicate` if the
    /// `(story_id, language)` pair is already registered.
    fn register(&self, new: NewRecord) -> StoreResult<VideoId>;

    /// Fetch one record; fails with `NotFound` if absent.
    fn get(&self, video_id: &VideoId) -> StoreResult<VideoRecord>;

    /// Validate and apply a transition, stamp `updated_at`, persist.
    fn update(&self, video_id: &VideoId, transition: Transition) -> StoreResult<VideoRecord>;

    /// Like `update`, but first checks the record is still in `expected`.
    ///
    /// Fails with `StatusChanged` when the record moved on since the caller
    /// took its snapshot.
    fn update_expecting(
        &self,
        video_id: &VideoId,
        expected: VideoStatus,
        transition: Transition,
    ) -> StoreResult<VideoRecord>;

    /// Set the priority hint without changing status.
    fn set_quality_score(&self, video_id: &VideoId, score: f64) -> StoreResult<VideoRecord>;

    /// Snapshot of every record, ordered by video ID.
    fn all(&self) -> StoreResult<Vec<VideoRecord>>;
}

/// Query helpers available on every store, including `dyn RecordStore`.
pub trait RecordStoreExt: RecordStore {
    /// Linear scan filter over a snapshot.
    fn query<P>(&self, predicate: P) -> StoreResult<Vec<VideoRecord>>
    where
        P: Fn(&VideoRecord) -> bool,
    {
        Ok(self.all()?.into_iter().filter(|r| predicate(r)).collect())
    }

    fn by_status(&self, status: VideoStatus) -> StoreResult<Vec<VideoRecord>> {
        self.query(|r| r.status == status)
    }

    fn by_language(&self, language: &str) -> StoreResult<Vec<VideoRecord>> {
        self.query(|r| r.language == language)
    }

    fn contains(&self, video_id: &VideoId) -> StoreResult<bool> {
        match self.get(video_id) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl<T: RecordStore + ?Sized> RecordStoreExt for T {}
