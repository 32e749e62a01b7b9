//! Command handlers. Each one is a thin caller of the library operations.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context as _};
use tracing::info;

use reel_models::{NewRecord, TrackerDocument, Transition, VideoId, VideoStatus};
use reel_scheduler::{
    BatchSelector, ProductionConfig, ProductionSummary, PublishScheduler, SummaryReporter,
};
use reel_store::{JsonFileRecordStore, RecordStore};

use crate::cli::{Cli, Commands, UpdateStatusArgs};
use crate::stories;

/// Store and config shared by every command.
pub struct Context {
    pub store: Arc<JsonFileRecordStore>,
    pub config: ProductionConfig,
}

impl Context {
    pub fn open(tracker: &Path, config: &Path) -> anyhow::Result<Self> {
        let store = JsonFileRecordStore::open(tracker)
            .with_context(|| format!("opening tracker {}", tracker.display()))?;
        let config = ProductionConfig::load_or_init(config)
            .with_context(|| format!("loading config {}", config.display()))?;
        Ok(Self {
            store: Arc::new(store),
            config,
        })
    }

    fn selector(&self) -> BatchSelector {
        BatchSelector::new(self.store.clone(), self.config.clone())
    }

    fn scheduler(&self) -> anyhow::Result<PublishScheduler> {
        Ok(PublishScheduler::new(self.store.clone(), self.config.clone())?)
    }

    fn reporter(&self, days: u32) -> SummaryReporter {
        SummaryReporter::new(self.store.clone(), self.config.clone()).with_window_days(days)
    }
}

/// Run the parsed command.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Schema = cli.command {
        let schema = schemars::schema_for!(TrackerDocument);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let ctx = Context::open(&cli.tracker, &cli.config)?;
    match cli.command {
        Commands::Status { days } => status(&ctx, days),
        Commands::Batch {
            size,
            languages,
            commit,
        } => batch(&ctx, size, languages, commit),
        Commands::Schedule { days, dry_run } => schedule(&ctx, days, dry_run),
        Commands::UpdateStatus(args) => update_status(&ctx, args),
        Commands::Register {
            story_id,
            language,
            script_path,
            title,
            duration,
        } => {
            let mut new = NewRecord::new(story_id, language, script_path, title);
            if let Some(duration) = duration {
                new = new.with_duration(duration);
            }
            let video_id = ctx.store.register(new)?;
            println!("Registered {}", video_id);
            Ok(())
        }
        Commands::RegisterDir { stories_dir } => {
            let report = stories::register_dir(ctx.store.as_ref(), &stories_dir)?;
            for (path, reason) in &report.failed {
                println!("Failed {}: {}", path.display(), reason);
            }
            println!(
                "Registered {} new scripts ({} already tracked, {} failed)",
                report.registered.len(),
                report.duplicates.len(),
                report.failed.len()
            );
            Ok(())
        }
        Commands::SetQuality { video_id, score } => {
            let record = ctx.store.set_quality_score(&VideoId::from(video_id), score)?;
            println!("{} quality score set to {:.2}", record.video_id, score);
            Ok(())
        }
        Commands::Reschedule { video_id, reason } => {
            let record = ctx.scheduler()?.reschedule(&VideoId::from(video_id), reason)?;
            println!("{} returned to the publish queue", record.video_id);
            Ok(())
        }
        Commands::Publish { ids, youtube_id } => publish(&ctx, &ids, youtube_id.as_deref()),
        Commands::Report { output, days } => {
            let report = ctx.reporter(days).render_report()?;
            match output {
                Some(path) => {
                    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&path, report)
                        .with_context(|| format!("writing report {}", path.display()))?;
                    info!(path = %path.display(), "Wrote production report");
                    println!("Report written to {}", path.display());
                }
                None => print!("{}", report),
            }
            Ok(())
        }
        Commands::Schema => Ok(()),
    }
}

fn status(ctx: &Context, days: u32) -> anyhow::Result<()> {
    let summary = ctx.reporter(days).summary()?;
    print!("{}", render_dashboard(&summary));
    Ok(())
}

/// Plain-text dashboard for `status`.
pub fn render_dashboard(summary: &ProductionSummary) -> String {
    let mut out = String::new();
    out.push_str("Video Production Dashboard\n");
    out.push_str(&format!("  Total videos:          {}\n", summary.total_videos));
    out.push_str(&format!("  Next production batch: {}\n", summary.next_batch_size));
    out.push_str(&format!("  Ready to publish:      {}\n", summary.ready_to_publish));
    out.push_str(&format!("  Eligible to schedule:  {}\n", summary.eligible_to_publish));

    out.push_str("\nBy status\n");
    for (status, count) in summary.by_status.iter().filter(|(_, c)| **c > 0) {
        out.push_str(&format!("  {:<18} {}\n", status.label(), count));
    }

    out.push_str("\nBy language\n");
    for (language, count) in &summary.by_language {
        out.push_str(&format!("  {:<18} {}\n", language.to_uppercase(), count));
    }

    out.push_str(&format!("\nUpcoming ({} days)\n", summary.window_days));
    if summary.upcoming.is_empty() {
        out.push_str("  nothing scheduled\n");
    }
    for entry in &summary.upcoming {
        out.push_str(&format!(
            "  {}  {}  {}\n",
            entry.publish_at.format("%Y-%m-%d %H:%M UTC"),
            entry.video_id,
            entry.title
        ));
    }
    out
}

fn batch(
    ctx: &Context,
    size: Option<usize>,
    languages: Option<Vec<String>>,
    commit: bool,
) -> anyhow::Result<()> {
    let selector = ctx.selector();
    let size = size.unwrap_or(ctx.config.batch_size);
    let languages = languages.unwrap_or_else(|| ctx.config.languages_priority.clone());

    let batch = selector.get_next_production_batch(size, &languages)?;
    if batch.is_empty() {
        println!("No scripts ready for production");
        return Ok(());
    }

    println!("Next production batch ({} videos)", batch.total());
    for group in &batch.groups {
        println!("  {}:", group.language.to_uppercase());
        for record in &group.records {
            println!("    {}  {}", record.video_id, record.title);
        }
    }

    if commit {
        let outcome = selector.mark_batch_in_production(&batch)?;
        println!(
            "Batch {} started: {} in production, {} skipped",
            outcome.batch_id,
            outcome.marked.len(),
            outcome.skipped.len()
        );
        for skipped in &outcome.skipped {
            println!("  skipped {}: {}", skipped.video_id, skipped.reason);
        }
    }
    Ok(())
}

fn schedule(ctx: &Context, days: u32, dry_run: bool) -> anyhow::Result<()> {
    let scheduler = ctx.scheduler()?;

    if dry_run {
        let queue = scheduler.publishing_queue(days)?;
        if queue.is_empty() {
            println!("Nothing to schedule in the next {} days", days);
        }
        for assignment in &queue {
            println!(
                "  {}  {}  {}",
                assignment.slot.publish_at.format("%Y-%m-%d %H:%M UTC"),
                assignment.record.video_id,
                assignment.record.title
            );
        }
        return Ok(());
    }

    let outcome = scheduler.auto_schedule_videos_at(chrono::Utc::now(), days)?;
    if !outcome.any_scheduled() {
        println!("No videos scheduled");
    }
    for scheduled in &outcome.scheduled {
        println!(
            "  {}  {}",
            scheduled.publish_at.format("%Y-%m-%d %H:%M UTC"),
            scheduled.video_id
        );
    }
    for skipped in &outcome.skipped {
        println!("  skipped {}: {}", skipped.video_id, skipped.reason);
    }
    if outcome.unplaced > 0 {
        println!("{} eligible videos are waiting for a free slot", outcome.unplaced);
    }
    Ok(())
}

/// Map `update-status` arguments onto the transition for the target status.
pub fn transition_for(args: &UpdateStatusArgs) -> anyhow::Result<Transition> {
    let transition = match args.status {
        VideoStatus::ScriptReady => bail!("records cannot be moved back to script_ready"),
        VideoStatus::InProduction => Transition::InProduction {
            note: args.reason.clone(),
        },
        VideoStatus::VideoReady => Transition::VideoReady {
            video_path: args.video_path.clone(),
            duration_seconds: args.duration,
            file_size_mb: args.file_size,
        },
        VideoStatus::ThumbnailNeeded => Transition::ThumbnailNeeded {
            thumbnail_path: args.thumbnail_path.clone(),
        },
        VideoStatus::ReadyToPublish => Transition::ReadyToPublish {
            thumbnail_path: args.thumbnail_path.clone(),
        },
        VideoStatus::Scheduled => match args.publish_time {
            Some(publish_at) => Transition::Scheduled { publish_at },
            None => bail!("--publish-time is required to schedule a video"),
        },
        VideoStatus::Published => Transition::Published {
            youtube_video_id: args.youtube_id.clone(),
            published_at: args.publish_time,
        },
        VideoStatus::Failed => Transition::Failed {
            reason: args
                .reason
                .clone()
                .unwrap_or_else(|| "marked failed by operator".to_string()),
        },
    };
    Ok(transition)
}

fn update_status(ctx: &Context, args: UpdateStatusArgs) -> anyhow::Result<()> {
    let transition = transition_for(&args)?;
    let video_id = VideoId::from(args.video_id);
    let record = ctx.store.update(&video_id, transition)?;
    println!("{} is now {}", record.video_id, record.status);
    Ok(())
}

fn publish(ctx: &Context, ids: &[String], youtube_id: Option<&str>) -> anyhow::Result<()> {
    let outcome = ctx.scheduler()?.mark_published(ids, youtube_id)?;
    for video_id in &outcome.published {
        println!("Published {}", video_id);
    }
    for video_id in &outcome.already_published {
        println!("Already published {}", video_id);
    }
    for video_id in &outcome.not_found {
        println!("Not found {}", video_id);
    }
    for rejected in &outcome.rejected {
        println!("Not published {}: {}", rejected.video_id, rejected.reason);
    }
    if !outcome.any_published() && outcome.already_published.is_empty() {
        bail!("no videos were published");
    }
    Ok(())
}
