//! In-memory record store.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use reel_models::{NewRecord, TrackerDocument, Transition, VideoId, VideoRecord, VideoStatus};

use crate::error::{StoreError, StoreResult};
use crate::metrics;
use crate::ops;
use crate::store::RecordStore;

/// Record store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    doc: Mutex<TrackerDocument>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records, keyed by their `video_id`.
    pub fn with_records(records: impl IntoIterator<Item = VideoRecord>) -> Self {
        Self {
            doc: Mutex::new(records.into_iter().collect()),
        }
    }

    /// Copy of the whole document.
    pub fn snapshot(&self) -> StoreResult<TrackerDocument> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, TrackerDocument>> {
        self.doc
            .lock()
            .map_err(|_| StoreError::persistence("record store lock poisoned"))
    }

    fn mutate<T>(&self, op: impl FnOnce(&mut TrackerDocument) -> StoreResult<T>) -> StoreResult<T> {
        let mut doc = self.lock()?;
        // a failed op leaves the stored document untouched
        let mut next = doc.clone();
        let out = op(&mut next)?;
        *doc = next;
        metrics::record_write("memory");
        Ok(out)
    }
}

impl RecordStore for MemoryRecordStore {
    fn register(&self, new: NewRecord) -> StoreResult<VideoId> {
        self.mutate(|doc| ops::register(doc, new, Utc::now()))
            .map(ops::registered)
    }

    fn get(&self, video_id: &VideoId) -> StoreResult<VideoRecord> {
        ops::get(&*self.lock()?, video_id)
    }

    fn update(&self, video_id: &VideoId, transition: Transition) -> StoreResult<VideoRecord> {
        self.mutate(|doc| ops::update(doc, video_id, None, transition, Utc::now()))
            .map(ops::Updated::committed)
    }

    fn update_expecting(
        &self,
        video_id: &VideoId,
        expected: VideoStatus,
        transition: Transition,
    ) -> StoreResult<VideoRecord> {
        self.mutate(|doc| ops::update(doc, video_id, Some(expected), transition, Utc::now()))
            .map(ops::Updated::committed)
    }

    fn set_quality_score(&self, video_id: &VideoId, score: f64) -> StoreResult<VideoRecord> {
        self.mutate(|doc| ops::set_quality_score(doc, video_id, score, Utc::now()))
    }

    fn all(&self) -> StoreResult<Vec<VideoRecord>> {
        Ok(self.lock()?.records.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordStoreExt;

    #[test]
    fn test_register_and_get() {
        let store = MemoryRecordStore::new();
        let id = store
            .register(
                NewRecord::new("001", "en", "stories/en/001_en.json", "The Well").with_duration(90),
            )
            .unwrap();
        assert_eq!(id.as_str(), "001_en");

        let record = store.get(&id).unwrap();
        assert_eq!(record.status, VideoStatus::ScriptReady);
        assert_eq!(record.duration_seconds, Some(90));
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let store = MemoryRecordStore::new();
        store.register(NewRecord::new("001", "en", "a.json", "A")).unwrap();
        let err = store.register(NewRecord::new("001", "en", "b.json", "B")).unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(store.get(&"001_en".into()).unwrap().title, "A");
    }

    #[test]
    fn test_get_unknown_fails() {
        let store = MemoryRecordStore::new();
        assert!(store.get(&"nope_en".into()).unwrap_err().is_not_found());
        assert!(!store.contains(&"nope_en".into()).unwrap());
    }

    #[test]
    fn test_invalid_transition_leaves_record_unchanged() {
        let store = MemoryRecordStore::new();
        let id = store.register(NewRecord::new("001", "en", "a.json", "A")).unwrap();
        let before = store.get(&id).unwrap();

        let err = store
            .update(&id, Transition::publish("yt", Utc::now()))
            .unwrap_err();
        assert!(err.is_invalid_transition());
        assert_eq!(store.get(&id).unwrap(), before);
    }

    #[test]
    fn test_update_stamps_updated_at() {
        let store = MemoryRecordStore::new();
        let id = store.register(NewRecord::new("001", "en", "a.json", "A")).unwrap();
        let before = store.get(&id).unwrap();
        let after = store.update(&id, Transition::mark_in_production("batch")).unwrap();
        assert_eq!(after.status, VideoStatus::InProduction);
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(store.get(&id).unwrap(), after);
    }

    #[test]
    fn test_query_helpers() {
        let store = MemoryRecordStore::new();
        store.register(NewRecord::new("001", "en", "a.json", "A")).unwrap();
        store.register(NewRecord::new("001", "es", "b.json", "B")).unwrap();
        let id = store.register(NewRecord::new("002", "en", "c.json", "C")).unwrap();
        store.update(&id, Transition::fail("bad script")).unwrap();

        assert_eq!(store.by_language("en").unwrap().len(), 2);
        assert_eq!(store.by_status(VideoStatus::ScriptReady).unwrap().len(), 2);
        assert_eq!(store.query(|r| r.story_id == "001").unwrap().len(), 2);
        assert_eq!(store.all().unwrap().len(), 3);
    }
}
