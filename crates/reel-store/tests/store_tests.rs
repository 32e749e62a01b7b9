//! File store integration tests.

use chrono::{Duration, Utc};

use reel_models::{NewRecord, TrackerDocument, Transition, VideoId, VideoStatus};
use reel_store::{JsonFileRecordStore, RecordStore, RecordStoreExt};

fn open_temp() -> (tempfile::TempDir, JsonFileRecordStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store =
        JsonFileRecordStore::open(dir.path().join("data/video_tracker.json")).expect("open store");
    (dir, store)
}

#[test]
fn test_lifecycle_survives_reopen() {
    let (_dir, store) = open_temp();
    let id = store
        .register(
            NewRecord::new("007", "es", "data/stories/es/007_es.json", "El Faro")
                .with_duration(150),
        )
        .unwrap();

    store.update(&id, Transition::mark_in_production("batch 1")).unwrap();
    store
        .update(&id, Transition::mark_video_ready("videos/007_es.mp4", Some(149), Some(31.2)))
        .unwrap();
    store.update(&id, Transition::mark_ready_to_publish("thumbs/007_es.png")).unwrap();
    let publish_at = Utc::now() + Duration::days(2);
    store
        .update_expecting(&id, VideoStatus::ReadyToPublish, Transition::schedule(publish_at))
        .unwrap();

    let reopened = JsonFileRecordStore::open(store.path()).unwrap();
    let record = reopened.get(&id).unwrap();
    assert_eq!(record.status, VideoStatus::Scheduled);
    assert_eq!(record.scheduled_publish_time, Some(publish_at));
    assert_eq!(record.video_path.as_deref(), Some("videos/007_es.mp4"));
    assert_eq!(record.file_size_mb, Some(31.2));
    let notes = record.notes.unwrap();
    assert!(notes.starts_with("batch 1"));
    assert!(notes.contains("Scheduled for"));
}

#[test]
fn test_round_trip_reproduces_identical_record_set() {
    let (_dir, store) = open_temp();
    for (story, lang) in [("001", "en"), ("001", "fr"), ("002", "ur")] {
        store
            .register(NewRecord::new(story, lang, format!("{story}_{lang}.json"), "Title"))
            .unwrap();
    }
    store.set_quality_score(&VideoId::from("001_fr"), 0.8).unwrap();
    store.update(&VideoId::from("002_ur"), Transition::fail("translation missing")).unwrap();

    let before = store.load().unwrap();
    store.save(&before).unwrap();
    let after = store.load().unwrap();
    assert_eq!(before, after);

    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert_eq!(TrackerDocument::from_json(&raw).unwrap(), before);
    assert!(raw.contains("\"status\": \"failed\""));
}

#[test]
fn test_optimistic_update_detects_changed_status() {
    let (_dir, store) = open_temp();
    let id = store.register(NewRecord::new("003", "en", "a.json", "A")).unwrap();

    // a second handle stands in for another operator run
    let other = JsonFileRecordStore::open(store.path()).unwrap();
    other.update(&id, Transition::mark_in_production("other run")).unwrap();

    let err = store
        .update_expecting(&id, VideoStatus::ScriptReady, Transition::mark_in_production("this run"))
        .unwrap_err();
    assert!(err.is_lost_race());
    assert_eq!(store.get(&id).unwrap().notes.as_deref(), Some("other run"));
}

#[test]
fn test_reads_legacy_tracker_file() {
    let (_dir, store) = open_temp();
    std::fs::write(
        store.path(),
        r#"{
  "004_en": {
    "story_id": "004",
    "title": "Legacy",
    "language": "en",
    "status": "scheduled",
    "created_at": "2025-02-01T09:00:00.000001",
    "updated_at": "2025-02-01T09:30:00",
    "script_path": "data/stories/en/004_en.json",
    "scheduled_publish_time": "2025-02-03T10:00:00",
    "youtube_title": "Legacy | Stories",
    "youtube_tags": null,
    "instadoodle_project_id": "proj-88",
    "view_count": 1234
  }
}"#,
    )
    .unwrap();

    let record = store.get(&VideoId::from("004_en")).unwrap();
    assert_eq!(record.video_id.as_str(), "004_en");
    assert_eq!(record.status, VideoStatus::Scheduled);
    assert!(record.scheduled_publish_time.is_some());
    assert_eq!(store.by_status(VideoStatus::Scheduled).unwrap().len(), 1);

    // writes fill the derived ID and keep fields this tracker does not own
    store.register(NewRecord::new("005", "en", "data/stories/en/005_en.json", "New")).unwrap();
    store.update(&VideoId::from("004_en"), Transition::publish("yt-1", Utc::now())).unwrap();
    let raw = std::fs::read_to_string(store.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let legacy = &value["004_en"];
    assert_eq!(legacy["video_id"], "004_en");
    assert_eq!(legacy["status"], "published");
    assert_eq!(legacy["youtube_title"], "Legacy | Stories");
    assert_eq!(legacy["instadoodle_project_id"], "proj-88");
    assert_eq!(legacy["view_count"], 1234);
    assert!(legacy["youtube_tags"].is_null());
    assert!(value["005_en"].get("view_count").is_none());
}

#[test]
fn test_scheduled_row_without_time_is_corrupt() {
    let (_dir, store) = open_temp();
    let legacy = r#"{
  "009_ur": {
    "story_id": "009",
    "title": "Legacy",
    "language": "ur",
    "status": "scheduled",
    "created_at": "2025-02-01T09:00:00",
    "updated_at": "2025-02-01T09:30:00",
    "scheduled_publish_time": null
  }
}"#;
    std::fs::write(store.path(), legacy).unwrap();

    let err = store.all().unwrap_err();
    assert!(matches!(err, reel_store::StoreError::Corrupt { .. }));
    // nothing is rewritten
    assert!(store.register(NewRecord::new("010", "ur", "s.json", "T")).is_err());
    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), legacy);
}
