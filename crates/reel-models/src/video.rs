//! Video record models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::asset::AssetKind;
use crate::status::{TransitionError, VideoStatus};
use crate::transition::Transition;

/// Identifier of a tracked video, always `{story_id}_{language}`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Derive the ID for a (story, language) pair.
    pub fn for_story(story_id: &str, language: &str) -> Self {
        Self(format!("{}_{}", story_id, language))
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Input to registration of a translated script.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub story_id: String,
    pub language: String,
    pub script_path: String,
    pub title: String,
    pub duration_seconds: Option<u32>,
}

impl NewRecord {
    pub fn new(
        story_id: impl Into<String>,
        language: impl Into<String>,
        script_path: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            story_id: story_id.into(),
            language: language.into(),
            script_path: script_path.into(),
            title: title.into(),
            duration_seconds: None,
        }
    }

    pub fn with_duration(mut self, duration_seconds: u32) -> Self {
        self.duration_seconds = Some(duration_seconds);
        self
    }

    /// The ID this record will be stored under.
    pub fn video_id(&self) -> VideoId {
        VideoId::for_story(&self.story_id, &self.language)
    }
}

/// One tracked (story, language) video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    /// Derived key; filled from the document key when absent in legacy files
    #[serde(default)]
    pub video_id: VideoId,

    pub story_id: String,

    pub language: String,

    #[serde(default)]
    pub status: VideoStatus,

    pub title: String,

    #[serde(deserialize_with = "crate::timestamp::deserialize")]
    pub created_at: DateTime<Utc>,

    /// Never decreases
    #[serde(deserialize_with = "crate::timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub script_path: Option<String>,

    #[serde(default)]
    pub video_path: Option<String>,

    #[serde(default)]
    pub thumbnail_path: Option<String>,

    #[serde(default)]
    pub duration_seconds: Option<u32>,

    #[serde(default)]
    pub file_size_mb: Option<f64>,

    /// Set only by the publish transition
    #[serde(default)]
    pub youtube_video_id: Option<String>,

    /// Non-null iff status == scheduled
    #[serde(default, deserialize_with = "crate::timestamp::deserialize_option")]
    pub scheduled_publish_time: Option<DateTime<Utc>>,

    /// Non-null iff status == published
    #[serde(default, deserialize_with = "crate::timestamp::deserialize_option")]
    pub actual_publish_time: Option<DateTime<Utc>>,

    /// Priority hint in [0, 1]
    #[serde(default)]
    pub quality_score: Option<f64>,

    /// Audit trail, one entry per line
    #[serde(default)]
    pub notes: Option<String>,

    /// Fields owned by other tooling (YouTube metadata, analytics), kept as written
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl VideoRecord {
    /// Create a SCRIPT_READY record from a registration request.
    pub fn from_new(new: NewRecord, now: DateTime<Utc>) -> Self {
        Self {
            video_id: new.video_id(),
            story_id: new.story_id,
            language: new.language,
            status: VideoStatus::ScriptReady,
            title: new.title,
            created_at: now,
            updated_at: now,
            script_path: Some(new.script_path),
            video_path: None,
            thumbnail_path: None,
            duration_seconds: new.duration_seconds,
            file_size_mb: None,
            youtube_video_id: None,
            scheduled_publish_time: None,
            actual_publish_time: None,
            quality_score: None,
            notes: None,
            extra: BTreeMap::new(),
        }
    }

    /// Apply a transition, leaving the record untouched if the edge is illegal.
    pub fn apply(
        &mut self,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        transition.validate_from(self.status)?;
        let target = transition.target();

        match transition {
            Transition::InProduction { note } => {
                if let Some(note) = note {
                    self.append_note(note);
                }
            }
            Transition::VideoReady {
                video_path,
                duration_seconds,
                file_size_mb,
            } => {
                if video_path.is_some() {
                    self.video_path = video_path;
                }
                if duration_seconds.is_some() {
                    self.duration_seconds = duration_seconds;
                }
                if file_size_mb.is_some() {
                    self.file_size_mb = file_size_mb;
                }
            }
            Transition::ThumbnailNeeded { thumbnail_path }
            | Transition::ReadyToPublish { thumbnail_path } => {
                if thumbnail_path.is_some() {
                    self.thumbnail_path = thumbnail_path;
                }
            }
            Transition::Scheduled { publish_at } => {
                self.scheduled_publish_time = Some(publish_at);
                self.append_note(format!(
                    "Scheduled for {}",
                    publish_at.format("%Y-%m-%d %H:%M UTC")
                ));
            }
            Transition::Rescheduled { reason } => {
                let note = match reason {
                    Some(reason) => format!("Returned to publish queue: {}", reason),
                    None => "Returned to publish queue".to_string(),
                };
                self.append_note(note);
            }
            Transition::Published {
                youtube_video_id,
                published_at,
            } => {
                self.actual_publish_time = Some(published_at.unwrap_or(now));
                if youtube_video_id.is_some() {
                    self.youtube_video_id = youtube_video_id;
                }
            }
            Transition::Failed { reason } => {
                self.append_note(format!("Failed: {}", reason));
            }
        }

        self.status = target;
        if target != VideoStatus::Scheduled {
            self.scheduled_publish_time = None;
        }
        if target != VideoStatus::Published {
            self.actual_publish_time = None;
        }
        self.touch(now);
        Ok(())
    }

    /// Append one line to the audit trail.
    pub fn append_note(&mut self, note: impl AsRef<str>) {
        let note = note.as_ref().trim();
        if note.is_empty() {
            return;
        }
        match self.notes.as_mut() {
            Some(existing) if !existing.is_empty() => {
                existing.push('\n');
                existing.push_str(note);
            }
            _ => self.notes = Some(note.to_string()),
        }
    }

    /// Stamp `updated_at`, never moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.updated_at);
    }

    /// Whether the artifact reference for `asset` is present.
    pub fn has_asset(&self, asset: AssetKind) -> bool {
        let path = match asset {
            AssetKind::Script => &self.script_path,
            AssetKind::Video => &self.video_path,
            AssetKind::Thumbnail => &self.thumbnail_path,
        };
        path.as_deref().is_some_and(|p| !p.trim().is_empty())
    }
}

/// The whole persisted tracker file: a JSON object keyed by video ID.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TrackerDocument {
    pub records: BTreeMap<VideoId, VideoRecord>,
}

impl TrackerDocument {
    /// Parse a tracker document, filling IDs missing from legacy rows.
    ///
    /// A SCHEDULED row without a scheduled time is rejected. A PUBLISHED row
    /// without a publish time takes its `updated_at`.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let mut doc: TrackerDocument = serde_json::from_str(raw)?;
        for (key, record) in doc.records.iter_mut() {
            if record.video_id.as_str().is_empty() {
                record.video_id = key.clone();
            }
            match record.status {
                VideoStatus::Scheduled if record.scheduled_publish_time.is_none() => {
                    return Err(serde::de::Error::custom(format!(
                        "{} is scheduled but has no scheduled_publish_time",
                        key
                    )));
                }
                VideoStatus::Published if record.actual_publish_time.is_none() => {
                    record.actual_publish_time = Some(record.updated_at);
                }
                _ => {}
            }
        }
        Ok(doc)
    }

    /// Serialize as the pretty-printed on-disk form.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Number of tracked records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<VideoRecord> for TrackerDocument {
    fn from_iter<I: IntoIterator<Item = VideoRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().map(|r| (r.video_id.clone(), r)).collect(),
        }
    }
}
