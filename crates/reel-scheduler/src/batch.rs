//! Production batch selection.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use reel_models::{Transition, VideoId, VideoRecord, VideoStatus};
use reel_store::{RecordStore, RecordStoreExt};

use crate::config::ProductionConfig;
use crate::error::SchedulerResult;
use crate::logging::RecordLogger;
use crate::outcome::{BatchOutcome, SkippedRecord};

/// Records chosen for one language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageBatch {
    pub language: String,
    pub records: Vec<VideoRecord>,
}

/// Selected SCRIPT_READY records grouped by language.
///
/// Groups keep priority order; languages filled only by the leftover pass
/// follow in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductionBatch {
    pub groups: Vec<LanguageBatch>,
}

impl ProductionBatch {
    /// Records selected for `language`, if any.
    pub fn get(&self, language: &str) -> Option<&[VideoRecord]> {
        self.groups
            .iter()
            .find(|g| g.language == language)
            .map(|g| g.records.as_slice())
    }

    /// Records across every language.
    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Languages in group order.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.language.as_str())
    }

    /// Every selected record, group by group.
    pub fn records(&self) -> impl Iterator<Item = &VideoRecord> {
        self.groups.iter().flat_map(|g| g.records.iter())
    }

    /// `(language, count)` per group.
    pub fn counts(&self) -> Vec<(String, usize)> {
        self.groups
            .iter()
            .map(|g| (g.language.clone(), g.records.len()))
            .collect()
    }

    fn push(&mut self, record: VideoRecord) {
        match self.groups.iter_mut().find(|g| g.language == record.language) {
            Some(group) => group.records.push(record),
            None => self.groups.push(LanguageBatch {
                language: record.language.clone(),
                records: vec![record],
            }),
        }
    }
}

/// Pick up to `batch_size` records from `candidates`.
///
/// Each language in `priority` first gets up to `batch_size / priority.len()`
/// of its oldest records; remaining room is filled oldest-first from any
/// language. Only SCRIPT_READY candidates are considered.
pub fn select_batch(
    candidates: &[VideoRecord],
    batch_size: usize,
    priority: &[String],
) -> ProductionBatch {
    let mut ready: Vec<&VideoRecord> = candidates
        .iter()
        .filter(|r| r.status == VideoStatus::ScriptReady)
        .collect();
    ready.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.video_id.cmp(&b.video_id))
    });

    let mut batch = ProductionBatch::default();
    if batch_size == 0 || ready.is_empty() {
        return batch;
    }

    let per_language = if priority.is_empty() {
        0
    } else {
        batch_size / priority.len()
    };
    let mut selected: HashSet<&VideoId> = HashSet::new();
    let mut seen_languages: HashSet<&str> = HashSet::new();

    for language in priority {
        if !seen_languages.insert(language.as_str()) {
            continue;
        }
        let picks: Vec<&VideoRecord> = ready
            .iter()
            .copied()
            .filter(|r| r.language == *language)
            .take(per_language)
            .collect();
        for record in picks {
            selected.insert(&record.video_id);
            batch.push(record.clone());
        }
    }

    for record in ready.iter().copied() {
        if batch.total() >= batch_size {
            break;
        }
        if selected.insert(&record.video_id) {
            batch.push(record.clone());
        }
    }

    batch
}

/// Chooses the next records to push into production.
pub struct BatchSelector {
    store: Arc<dyn RecordStore>,
    config: ProductionConfig,
}

impl BatchSelector {
    /// Selector over `store` using `config`'s batch settings.
    pub fn new(store: Arc<dyn RecordStore>, config: ProductionConfig) -> Self {
        Self { store, config }
    }

    /// Next batch using the configured size and language priority.
    pub fn next_batch(&self) -> SchedulerResult<ProductionBatch> {
        self.get_next_production_batch(self.config.batch_size, &self.config.languages_priority)
    }

    /// Preview a batch without touching the store.
    pub fn get_next_production_batch(
        &self,
        batch_size: usize,
        language_priority: &[String],
    ) -> SchedulerResult<ProductionBatch> {
        let ready = self.store.by_status(VideoStatus::ScriptReady)?;
        let batch = select_batch(&ready, batch_size, language_priority);
        info!(
            available = ready.len(),
            selected = batch.total(),
            batch_size,
            "Selected production batch"
        );
        Ok(batch)
    }

    /// Move every record of `batch` to IN_PRODUCTION.
    ///
    /// Records that left SCRIPT_READY since selection are skipped and
    /// reported; storage failures abort and propagate.
    pub fn mark_batch_in_production(
        &self,
        batch: &ProductionBatch,
    ) -> SchedulerResult<BatchOutcome> {
        let mut outcome = BatchOutcome::new(Uuid::new_v4());
        let note = format!(
            "Started production batch {} on {}",
            outcome.batch_id,
            Utc::now().format("%Y-%m-%d")
        );

        for record in batch.records() {
            let logger = RecordLogger::new(&record.video_id, "mark_in_production");
            let _span = logger.create_span().entered();

            match self.store.update_expecting(
                &record.video_id,
                VideoStatus::ScriptReady,
                Transition::mark_in_production(note.clone()),
            ) {
                Ok(_) => {
                    logger.log_applied("in production");
                    outcome.marked.push(record.video_id.clone());
                }
                Err(e) if e.is_lost_race() => {
                    logger.log_skipped(&e.to_string());
                    outcome
                        .skipped
                        .push(SkippedRecord::new(record.video_id.clone(), e.to_string()));
                }
                Err(e) => {
                    logger.log_error(&e.to_string());
                    return Err(e.into());
                }
            }
        }

        info!(
            batch_id = %outcome.batch_id,
            marked = outcome.marked.len(),
            skipped = outcome.skipped.len(),
            "Production batch started"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use reel_models::NewRecord;
    use reel_store::{MemoryRecordStore, MockRecordStore, StoreError};

    fn langs(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    fn record(story: &str, language: &str, age_minutes: i64) -> VideoRecord {
        let created = Utc::now() - Duration::minutes(age_minutes);
        VideoRecord::from_new(NewRecord::new(story, language, "s.json", story), created)
    }

    #[test]
    fn test_quota_then_fifo_fill() {
        let mut records: Vec<VideoRecord> = (0..5)
            .map(|i| record(&format!("00{}", i), "en", 100 - i))
            .collect();
        records.push(record("010", "es", 10));

        let batch = select_batch(&records, 6, &langs(&["en", "es", "fr"]));
        assert_eq!(batch.total(), 6);
        assert_eq!(batch.get("en").map(|r| r.len()), Some(5));
        assert_eq!(batch.get("es").map(|r| r.len()), Some(1));
        assert!(batch.get("fr").is_none());

        // quota picks come first, oldest first, then the leftover fill
        let en: Vec<&str> = batch.get("en").unwrap().iter().map(|r| r.story_id.as_str()).collect();
        assert_eq!(en, vec!["000", "001", "002", "003", "004"]);
    }

    #[test]
    fn test_never_exceeds_batch_size() {
        let records: Vec<VideoRecord> = (0..10)
            .map(|i| record(&format!("{:03}", i), if i % 2 == 0 { "en" } else { "fr" }, 100 - i))
            .collect();
        let batch = select_batch(&records, 3, &langs(&["en", "fr"]));
        assert_eq!(batch.total(), 3);
        assert_eq!(batch.get("en").unwrap().len(), 2);
        assert_eq!(batch.get("fr").unwrap().len(), 1);
    }

    #[test]
    fn test_only_script_ready_selected() {
        let mut busy = record("001", "en", 50);
        busy.status = VideoStatus::InProduction;
        let records = vec![busy, record("002", "en", 10)];

        let batch = select_batch(&records, 5, &langs(&["en"]));
        assert_eq!(batch.total(), 1);
        assert!(batch.records().all(|r| r.status == VideoStatus::ScriptReady));
    }

    #[test]
    fn test_degenerate_inputs() {
        let records = vec![record("001", "ur", 10), record("002", "ur", 5)];
        assert!(select_batch(&records, 0, &langs(&["ur"])).is_empty());
        assert!(select_batch(&[], 5, &langs(&["ur"])).is_empty());

        // no priority list: everything comes from the leftover pass
        let batch = select_batch(&records, 1, &[]);
        assert_eq!(batch.total(), 1);
        assert_eq!(batch.records().next().unwrap().story_id, "001");
    }

    #[test]
    fn test_mark_batch_in_production() {
        let store = Arc::new(MemoryRecordStore::new());
        store.register(NewRecord::new("001", "en", "a.json", "A")).unwrap();
        store.register(NewRecord::new("001", "es", "b.json", "B")).unwrap();
        let selector = BatchSelector::new(store.clone(), ProductionConfig::default());

        let batch = selector.next_batch().unwrap();
        assert_eq!(batch.total(), 2);

        // another run got to one record first
        store
            .update(&VideoId::from("001_es"), Transition::fail("script rejected"))
            .unwrap();

        let outcome = selector.mark_batch_in_production(&batch).unwrap();
        assert_eq!(outcome.marked, vec![VideoId::from("001_en")]);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].video_id.as_str(), "001_es");

        let marked = store.get(&VideoId::from("001_en")).unwrap();
        assert_eq!(marked.status, VideoStatus::InProduction);
        assert!(marked
            .notes
            .unwrap()
            .contains(&format!("Started production batch {}", outcome.batch_id)));
    }

    #[test]
    fn test_empty_batch_is_not_an_error() {
        let store = Arc::new(MemoryRecordStore::new());
        let selector = BatchSelector::new(store, ProductionConfig::default());
        let batch = selector.next_batch().unwrap();
        assert!(batch.is_empty());
        let outcome = selector.mark_batch_in_production(&batch).unwrap();
        assert!(outcome.marked.is_empty());
    }

    #[test]
    fn test_persistence_error_propagates() {
        let ready = record("001", "en", 5);
        let mut mock = MockRecordStore::new();
        let snapshot = vec![ready.clone()];
        mock.expect_all().returning(move || Ok(snapshot.clone()));
        mock.expect_update_expecting()
            .times(1)
            .returning(|_, _, _| Err(StoreError::persistence("disk full")));

        let selector = BatchSelector::new(Arc::new(mock), ProductionConfig::default());
        let batch = selector.next_batch().unwrap();
        let err = selector.mark_batch_in_production(&batch).unwrap_err();
        assert!(matches!(err, crate::SchedulerError::Store(ref e) if e.is_persistence()));
    }
}
