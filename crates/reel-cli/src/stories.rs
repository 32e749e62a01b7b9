//! Bulk registration of translated story files.
//!
//! Layout: `<stories_dir>/<language>/<story_id>_<language>.json`, each file
//! holding at least a `title` and optionally an `estimated_duration` in
//! seconds.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::{info, warn};

use reel_models::NewRecord;
use reel_store::RecordStore;

#[derive(Debug, Deserialize)]
struct StoryFile {
    title: Option<String>,
    estimated_duration: Option<f64>,
}

/// Result of one `register-dir` run.
#[derive(Debug, Default)]
pub struct RegisterReport {
    pub registered: Vec<String>,
    pub duplicates: Vec<String>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Story ID for a file stem, with the `_<language>` suffix removed.
pub fn story_id_from_stem(stem: &str, language: &str) -> String {
    stem.strip_suffix(&format!("_{}", language))
        .filter(|s| !s.is_empty())
        .unwrap_or(stem)
        .to_string()
}

/// Build the registration input for one story file.
pub fn read_story(path: &Path, language: &str) -> anyhow::Result<NewRecord> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("unreadable file name {}", path.display()))?;
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let story: StoryFile =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    let title = story
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| stem.to_string());
    let mut new = NewRecord::new(
        story_id_from_stem(stem, language),
        language,
        path.display().to_string(),
        title,
    );
    if let Some(duration) = story.estimated_duration.filter(|d| d.is_finite() && *d >= 0.0) {
        new = new.with_duration(duration.round() as u32);
    }
    Ok(new)
}

/// Every story file under `stories_dir`, sorted by language then name.
fn story_files(stories_dir: &Path) -> anyhow::Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    let entries = fs::read_dir(stories_dir)
        .with_context(|| format!("stories directory not found: {}", stories_dir.display()))?;

    for entry in entries {
        let lang_dir = entry?.path();
        let Some(language) = lang_dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
        else {
            continue;
        };
        if !lang_dir.is_dir() || language.starts_with('.') {
            continue;
        }
        for file in fs::read_dir(&lang_dir)? {
            let path = file?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push((language.clone(), path));
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Register every story file not already tracked.
///
/// Unreadable files are reported and skipped; a store failure aborts.
pub fn register_dir(store: &dyn RecordStore, stories_dir: &Path) -> anyhow::Result<RegisterReport> {
    let mut report = RegisterReport::default();

    for (language, path) in story_files(stories_dir)? {
        let new = match read_story(&path, &language) {
            Ok(new) => new,
            Err(e) => {
                warn!(path = %path.display(), "Skipping story file: {:#}", e);
                report.failed.push((path, format!("{:#}", e)));
                continue;
            }
        };

        match store.register(new) {
            Ok(video_id) => report.registered.push(video_id.to_string()),
            Err(e) if e.is_duplicate() => {
                info!(path = %path.display(), "Already registered");
                report.duplicates.push(path.display().to_string());
            }
            Err(e) if e.is_persistence() => return Err(e.into()),
            Err(e) => report.failed.push((path, e.to_string())),
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_models::VideoId;
    use reel_store::MemoryRecordStore;

    fn write_story(root: &Path, language: &str, name: &str, body: &str) {
        let dir = root.join(language);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_story_id_from_stem() {
        assert_eq!(story_id_from_stem("042_es", "es"), "042");
        assert_eq!(story_id_from_stem("042", "es"), "042");
        assert_eq!(story_id_from_stem("_es", "es"), "_es");
    }

    #[test]
    fn test_register_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_story(
            dir.path(),
            "en",
            "001_en.json",
            r#"{"title": "The Lighthouse", "estimated_duration": 121.6}"#,
        );
        write_story(dir.path(), "es", "001_es.json", r#"{"title": "El Faro"}"#);
        write_story(dir.path(), "es", "broken_es.json", "{ nope");
        write_story(dir.path(), "es", "notes.txt", "ignored");
        write_story(dir.path(), ".cache", "x_en.json", r#"{"title": "hidden"}"#);

        let store = MemoryRecordStore::new();
        let report = register_dir(&store, dir.path()).unwrap();
        assert_eq!(report.registered, vec!["001_en", "001_es"]);
        assert_eq!(report.failed.len(), 1);

        let en = store.get(&VideoId::from("001_en")).unwrap();
        assert_eq!(en.title, "The Lighthouse");
        assert_eq!(en.duration_seconds, Some(122));
        assert!(en.script_path.unwrap().ends_with("001_en.json"));

        // second run only finds duplicates
        let again = register_dir(&store, dir.path()).unwrap();
        assert!(again.registered.is_empty());
        assert_eq!(again.duplicates.len(), 2);
    }

    #[test]
    fn test_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryRecordStore::new();
        assert!(register_dir(&store, &dir.path().join("absent")).is_err());
    }
}
