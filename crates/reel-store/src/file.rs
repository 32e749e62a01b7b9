//! JSON file record store.
//!
//! The whole record set is one pretty-printed JSON object keyed by video ID.
//! Every mutation reloads the file, applies the change and atomically
//! replaces the file through a temp file in the same directory. There is no
//! cross-process locking: two concurrent writers race and the last one wins.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::debug;

use reel_models::{NewRecord, TrackerDocument, Transition, VideoId, VideoRecord, VideoStatus};

use crate::error::{StoreError, StoreResult};
use crate::metrics;
use crate::ops;
use crate::store::RecordStore;

/// Default tracker location, relative to the working directory.
pub const DEFAULT_TRACKER_PATH: &str = "data/video_tracker.json";

/// Record store backed by a single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileRecordStore {
    path: PathBuf,
}

impl JsonFileRecordStore {
    /// Open a store at `path`, creating the parent directory if needed.
    ///
    /// A missing file reads as an empty store; it is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = parent_dir(&path) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document.
    pub fn load(&self) -> StoreResult<TrackerDocument> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(TrackerDocument::default()),
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(TrackerDocument::default());
        }

        TrackerDocument::from_json(&raw).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Atomically replace the document on disk.
    pub fn save(&self, doc: &TrackerDocument) -> StoreResult<()> {
        let dir = parent_dir(&self.path).unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, doc)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        metrics::record_write("file");
        debug!(path = %self.path.display(), records = doc.len(), "Saved tracker document");
        Ok(())
    }

    fn mutate<T>(&self, op: impl FnOnce(&mut TrackerDocument) -> StoreResult<T>) -> StoreResult<T> {
        let mut doc = self.load()?;
        let out = op(&mut doc)?;
        self.save(&doc)?;
        Ok(out)
    }
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

impl RecordStore for JsonFileRecordStore {
    fn register(&self, new: NewRecord) -> StoreResult<VideoId> {
        self.mutate(|doc| ops::register(doc, new, Utc::now()))
            .map(ops::registered)
    }

    fn get(&self, video_id: &VideoId) -> StoreResult<VideoRecord> {
        ops::get(&self.load()?, video_id)
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
        Ok(self.load()?.records.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::names;
    use crate::metrics::testing::CountingRecorder;

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileRecordStore::open(dir.path().join("nested/tracker.json")).unwrap();
        assert!(store.all().unwrap().is_empty());
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn test_corrupt_document_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileRecordStore::open(&path).unwrap();
        let err = store.all().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        assert!(err.is_persistence());

        // a failed load must not clobber the file
        assert!(store.register(NewRecord::new("001", "en", "a.json", "A")).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_writes_status_as_canonical_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileRecordStore::open(dir.path().join("tracker.json")).unwrap();
        let id = store.register(NewRecord::new("001", "ur", "a.json", "عنوان")).unwrap();
        store.update(&id, Transition::mark_in_production("batch")).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["001_ur"]["status"], "in_production");
        assert_eq!(value["001_ur"]["video_id"], "001_ur");
        // non-ASCII titles are written verbatim
        assert!(raw.contains("عنوان"));
    }

    #[test]
    fn test_failed_write_is_not_counted() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileRecordStore::open(dir.path().join("data/tracker.json")).unwrap();
        let recorder = CountingRecorder::default();

        ::metrics::with_local_recorder(&recorder, || {
            let id = store.register(NewRecord::new("001", "en", "a.json", "A")).unwrap();
            store.update(&id, Transition::mark_in_production("batch")).unwrap();
        });
        assert_eq!(recorder.count(names::RECORDS_REGISTERED_TOTAL), 1);
        assert_eq!(recorder.count(names::TRANSITIONS_TOTAL), 1);

        // the directory is gone, so the load reads empty and the save fails
        fs::remove_dir_all(dir.path().join("data")).unwrap();
        ::metrics::with_local_recorder(&recorder, || {
            let err = store.register(NewRecord::new("002", "en", "b.json", "B")).unwrap_err();
            assert!(err.is_persistence());
        });
        assert_eq!(recorder.count(names::RECORDS_REGISTERED_TOTAL), 1);
        assert_eq!(recorder.count(names::STORE_WRITES_TOTAL), 2);
    }
}
