//! Production configuration.
//!
//! Loaded from a JSON file with every field optional, then overridden by
//! `REEL__*` environment variables (`REEL__BATCH_SIZE=8`,
//! `REEL__UPLOAD_SCHEDULE__START_HOUR=9`, comma-separated lists).

use std::fs;
use std::path::Path;

use chrono::FixedOffset;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::{Validate, ValidationError};

use reel_models::{AssetKind, VideoRecord, VideoStatus};

use crate::error::{SchedulerError, SchedulerResult};

/// Default config location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/production_config.json";

/// Environment prefix for overrides.
pub const ENV_PREFIX: &str = "REEL";

/// Operator-tunable production settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProductionConfig {
    /// Default production batch size
    #[validate(range(min = 1))]
    pub batch_size: usize,
    /// Languages in production priority order
    #[validate(length(min = 1), custom(function = "validate_languages"))]
    pub languages_priority: Vec<String>,
    /// Publish slots per day
    #[validate(range(min = 1))]
    pub daily_upload_limit: u32,
    #[validate(nested)]
    pub upload_schedule: UploadSchedule,
    #[validate(nested)]
    pub quality_thresholds: QualityThresholds,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            languages_priority: ["en", "es", "fr", "ur"].map(String::from).to_vec(),
            daily_upload_limit: 2,
            upload_schedule: UploadSchedule::default(),
            quality_thresholds: QualityThresholds::default(),
        }
    }
}

/// Daily publishing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_hour_window"))]
pub struct UploadSchedule {
    #[validate(range(max = 23))]
    pub start_hour: u32,
    #[validate(range(min = 1, max = 24))]
    pub end_hour: u32,
    /// `UTC` or a fixed offset such as `+05:00`
    #[validate(custom(function = "validate_timezone"))]
    pub timezone: String,
    /// ISO weekdays, Monday = 1
    #[validate(length(min = 1), custom(function = "validate_weekdays"))]
    pub days_of_week: Vec<u8>,
}

impl Default for UploadSchedule {
    fn default() -> Self {
        Self {
            start_hour: 10,
            end_hour: 18,
            timezone: "UTC".to_string(),
            days_of_week: vec![1, 2, 3, 4, 5],
        }
    }
}

impl UploadSchedule {
    /// Offset of the configured timezone from UTC.
    pub fn utc_offset(&self) -> SchedulerResult<FixedOffset> {
        parse_utc_offset(&self.timezone)
            .ok_or_else(|| {
                SchedulerError::config(format!("unsupported timezone: {}", self.timezone))
            })
    }

    pub fn publishes_on(&self, iso_weekday: u32) -> bool {
        self.days_of_week.iter().any(|d| u32::from(*d) == iso_weekday)
    }
}

/// Eligibility rules for publishing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_duration_bounds"))]
pub struct QualityThresholds {
    /// Minimum duration in seconds
    pub min_duration: u32,
    /// Maximum duration in seconds
    pub max_duration: u32,
    /// Carried for the readability scorer; not consulted here
    pub min_readability: f64,
    pub required_assets: Vec<AssetKind>,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_duration: 60,
            max_duration: 300,
            min_readability: 8.0,
            required_assets: vec![AssetKind::Script, AssetKind::Video, AssetKind::Thumbnail],
        }
    }
}

impl QualityThresholds {
    /// First reason `record` fails the thresholds, if any.
    ///
    /// A record with no known duration never qualifies.
    pub fn rejection(&self, record: &VideoRecord) -> Option<String> {
        match record.duration_seconds {
            None => return Some("duration unknown".to_string()),
            Some(d) if d < self.min_duration || d > self.max_duration => {
                return Some(format!(
                    "duration {}s outside [{}, {}]",
                    d, self.min_duration, self.max_duration
                ));
            }
            Some(_) => {}
        }

        self.required_assets
            .iter()
            .find(|asset| !record.has_asset(**asset))
            .map(|asset| format!("missing {} asset", asset))
    }

    pub fn admits(&self, record: &VideoRecord) -> bool {
        self.rejection(record).is_none()
    }
}

impl ProductionConfig {
    /// Load from an optional JSON file, then apply `REEL__*` overrides.
    ///
    /// A missing file is not an error; the defaults apply.
    pub fn load(path: Option<&Path>) -> SchedulerResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Json).required(false));
        }

        let config: ProductionConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("languages_priority")
                    .with_list_parse_key("upload_schedule.days_of_week")
                    .with_list_parse_key("quality_thresholds.required_assets"),
            )
            .build()?
            .try_deserialize()?;

        config.validate_all()?;
        Ok(config)
    }

    /// Load `path`, writing the defaults there first if it does not exist.
    pub fn load_or_init(path: &Path) -> SchedulerResult<Self> {
        if !path.exists() {
            Self::default().save(path)?;
            info!(path = %path.display(), "Wrote default production config");
        }
        Self::load(Some(path))
    }

    pub fn save(&self, path: &Path) -> SchedulerResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut raw = serde_json::to_string_pretty(self)?;
        raw.push('\n');
        fs::write(path, raw)?;
        Ok(())
    }

    /// Run every validation rule, flattening failures into one message.
    pub fn validate_all(&self) -> SchedulerResult<()> {
        self.validate()
            .map_err(|e| SchedulerError::config(e.to_string()))
    }

    /// Whether `record` may be placed in a publish slot.
    pub fn is_publish_eligible(&self, record: &VideoRecord) -> bool {
        record.status == VideoStatus::ReadyToPublish && self.quality_thresholds.admits(record)
    }
}

/// Parse `UTC`, `Z`, `+HH:MM`, `-HHMM`, `UTC+05:30` and the like.
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    let rest = ["UTC", "utc", "GMT", "gmt"]
        .iter()
        .find_map(|prefix| raw.strip_prefix(prefix))
        .unwrap_or(raw);

    if rest.is_empty() || rest == "Z" || rest == "z" {
        return FixedOffset::east_opt(0);
    }

    let (sign, digits) = if let Some(d) = rest.strip_prefix('+') {
        (1, d)
    } else if let Some(d) = rest.strip_prefix('-') {
        (-1, d)
    } else {
        return None;
    };
    if !digits.is_ascii() {
        return None;
    }
    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn validate_languages(languages: &[String]) -> Result<(), ValidationError> {
    if languages.iter().any(|l| l.trim().is_empty()) {
        return Err(ValidationError::new("empty_language"));
    }
    Ok(())
}

fn validate_timezone(timezone: &str) -> Result<(), ValidationError> {
    match parse_utc_offset(timezone) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("unsupported_timezone")),
    }
}

fn validate_weekdays(days: &[u8]) -> Result<(), ValidationError> {
    if days.iter().any(|d| !(1..=7).contains(d)) {
        return Err(ValidationError::new("weekday_out_of_range"));
    }
    Ok(())
}

fn validate_hour_window(schedule: &UploadSchedule) -> Result<(), ValidationError> {
    if schedule.start_hour >= schedule.end_hour {
        return Err(ValidationError::new("start_hour_not_before_end_hour"));
    }
    Ok(())
}

fn validate_duration_bounds(thresholds: &QualityThresholds) -> Result<(), ValidationError> {
    if thresholds.min_duration > thresholds.max_duration {
        return Err(ValidationError::new("min_duration_above_max_duration"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reel_models::NewRecord;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "REEL__BATCH_SIZE",
            "REEL__LANGUAGES_PRIORITY",
            "REEL__UPLOAD_SCHEDULE__START_HOUR",
            "REEL__UPLOAD_SCHEDULE__DAYS_OF_WEEK",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ProductionConfig::default();
        assert!(config.validate_all().is_ok());
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.languages_priority, vec!["en", "es", "fr", "ur"]);
        assert_eq!(config.upload_schedule.utc_offset().unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = ProductionConfig::default();
        config.daily_upload_limit = 0;
        assert!(config.validate_all().unwrap_err().is_config());

        let mut config = ProductionConfig::default();
        config.upload_schedule.start_hour = 18;
        assert!(config.validate_all().is_err());

        let mut config = ProductionConfig::default();
        config.upload_schedule.days_of_week = vec![0, 8];
        assert!(config.validate_all().is_err());

        let mut config = ProductionConfig::default();
        config.upload_schedule.timezone = "America/New_York".to_string();
        assert!(config.validate_all().is_err());

        let mut config = ProductionConfig::default();
        config.quality_thresholds.min_duration = 400;
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("+05:00").unwrap().local_minus_utc(), 5 * 3600);
        assert_eq!(parse_utc_offset("UTC-0330").unwrap().local_minus_utc(), -(3 * 3600 + 1800));
        assert_eq!(parse_utc_offset("-8").unwrap().local_minus_utc(), -8 * 3600);
        assert!(parse_utc_offset("Europe/Paris").is_none());
        assert!(parse_utc_offset("+25:00").is_none());
    }

    #[test]
    fn test_thresholds() {
        let thresholds = QualityThresholds::default();
        let mut record =
            VideoRecord::from_new(NewRecord::new("001", "en", "s.json", "t"), Utc::now());
        assert_eq!(thresholds.rejection(&record).as_deref(), Some("duration unknown"));

        record.duration_seconds = Some(120);
        assert_eq!(thresholds.rejection(&record).as_deref(), Some("missing video asset"));

        record.video_path = Some("v.mp4".to_string());
        record.thumbnail_path = Some("t.png".to_string());
        assert!(thresholds.admits(&record));

        record.duration_seconds = Some(301);
        assert!(!thresholds.admits(&record));
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let config = ProductionConfig::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config, ProductionConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_partial_file() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("production_config.json");
        fs::write(&path, r#"{"batch_size": 3, "upload_schedule": {"start_hour": 9}}"#).unwrap();

        let config = ProductionConfig::load(Some(&path)).unwrap();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.upload_schedule.start_hour, 9);
        assert_eq!(config.upload_schedule.end_hour, 18);
        assert_eq!(config.daily_upload_limit, 2);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("production_config.json");
        fs::write(&path, r#"{"batch_size": 3}"#).unwrap();

        std::env::set_var("REEL__BATCH_SIZE", "8");
        std::env::set_var("REEL__LANGUAGES_PRIORITY", "ur,en");
        std::env::set_var("REEL__UPLOAD_SCHEDULE__DAYS_OF_WEEK", "6,7");
        let config = ProductionConfig::load(Some(&path));
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.languages_priority, vec!["ur", "en"]);
        assert_eq!(config.upload_schedule.days_of_week, vec![6, 7]);
    }

    #[test]
    #[serial]
    fn test_load_rejects_invalid_file() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("production_config.json");
        fs::write(&path, r#"{"daily_upload_limit": 0}"#).unwrap();
        assert!(ProductionConfig::load(Some(&path)).unwrap_err().is_config());
    }

    #[test]
    #[serial]
    fn test_load_or_init_writes_defaults() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config/production_config.json");

        let config = ProductionConfig::load_or_init(&path).unwrap();
        assert_eq!(config, ProductionConfig::default());
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"required_assets\""));
        assert!(raw.contains("\"thumbnail\""));
    }
}
