//! CLI command definitions.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use reel_models::timestamp::parse_datetime;
use reel_models::VideoStatus;
use reel_scheduler::DEFAULT_CONFIG_PATH;
use reel_store::file::DEFAULT_TRACKER_PATH;

/// Reel - track translated story videos from script to publication
#[derive(Parser, Debug)]
#[command(name = "reel")]
#[command(about = "Track translated story videos from script to publication", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Tracker file
    #[arg(long, global = true, env = "REEL_TRACKER_FILE", default_value = DEFAULT_TRACKER_PATH)]
    pub tracker: PathBuf,

    /// Production config file, created with defaults if missing
    #[arg(long, global = true, env = "REEL_CONFIG_FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the production dashboard
    Status {
        /// Days of upcoming schedule to show
        #[arg(long, default_value_t = 7)]
        days: u32,
    },

    /// Preview the next production batch, optionally starting it
    Batch {
        /// Batch size (defaults to the configured size)
        #[arg(long)]
        size: Option<usize>,

        /// Comma-separated language priority (defaults to the configured list)
        #[arg(long, value_delimiter = ',')]
        languages: Option<Vec<String>>,

        /// Move the selected scripts to in_production
        #[arg(long)]
        commit: bool,
    },

    /// Assign publish-ready videos to upcoming slots
    Schedule {
        /// Days ahead to plan
        #[arg(long, default_value_t = 7)]
        days: u32,

        /// Show the assignment without saving it
        #[arg(long)]
        dry_run: bool,
    },

    /// Move one video along its lifecycle
    UpdateStatus(UpdateStatusArgs),

    /// Register one translated script
    Register {
        story_id: String,
        language: String,
        script_path: String,
        title: String,

        /// Estimated duration in seconds
        #[arg(long)]
        duration: Option<u32>,
    },

    /// Register every translated script under <dir>/<language>/*.json
    RegisterDir {
        #[arg(long, default_value = "data/stories")]
        stories_dir: PathBuf,
    },

    /// Set the publishing priority hint (0.0 to 1.0)
    SetQuality { video_id: String, score: f64 },

    /// Return a scheduled video to the publish queue
    Reschedule {
        video_id: String,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Mark videos published; a bare story ID covers every configured language
    Publish {
        #[arg(required = true)]
        ids: Vec<String>,

        /// YouTube video ID (single target only)
        #[arg(long)]
        youtube_id: Option<String>,
    },

    /// Write the Markdown production report
    Report {
        /// Output file (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,

        #[arg(long, default_value_t = 7)]
        days: u32,
    },

    /// Print the JSON schema of the tracker file
    Schema,
}

/// Arguments for `update-status`.
#[derive(Args, Debug, Clone, Default)]
pub struct UpdateStatusArgs {
    pub video_id: String,

    /// Target status (e.g. video_ready, ready-to-publish)
    pub status: VideoStatus,

    #[arg(long)]
    pub video_path: Option<String>,

    /// Duration in seconds
    #[arg(long)]
    pub duration: Option<u32>,

    /// File size in MB
    #[arg(long)]
    pub file_size: Option<f64>,

    #[arg(long)]
    pub thumbnail_path: Option<String>,

    #[arg(long)]
    pub youtube_id: Option<String>,

    /// Note for in_production, reason for failed
    #[arg(long)]
    pub reason: Option<String>,

    /// Publish time for scheduled, or actual time for published
    #[arg(long, value_parser = parse_datetime)]
    pub publish_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_update_status() {
        let cli = Cli::try_parse_from([
            "reel",
            "update-status",
            "001_en",
            "video-ready",
            "--video-path",
            "videos/001_en.mp4",
            "--duration",
            "95",
        ])
        .unwrap();

        match cli.command {
            Commands::UpdateStatus(args) => {
                assert_eq!(args.status, VideoStatus::VideoReady);
                assert_eq!(args.duration, Some(95));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_batch_languages() {
        let cli =
            Cli::try_parse_from(["reel", "batch", "--languages", "ur,en", "--commit"]).unwrap();
        match cli.command {
            Commands::Batch { languages, commit, size } => {
                assert_eq!(languages, Some(vec!["ur".to_string(), "en".to_string()]));
                assert!(commit);
                assert!(size.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_status() {
        assert!(Cli::try_parse_from(["reel", "update-status", "001_en", "uploaded"]).is_err());
    }

    #[test]
    fn test_publish_requires_ids() {
        assert!(Cli::try_parse_from(["reel", "publish"]).is_err());
    }
}
