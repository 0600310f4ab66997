//! Channel-to-shorts pipeline binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shorts_models::VideoStatus;
use shorts_pipeline::compose::SegmentComposer;
use shorts_pipeline::orchestrator::StatusReport;
use shorts_pipeline::ports::{SegmentSplitter, TokioPacer, YtDlpDownloader};
use shorts_pipeline::scrape::ChannelScraper;
use shorts_pipeline::upload::YouTubeUploader;
use shorts_pipeline::{Collaborators, PipelineConfig, PipelineOrchestrator, TrackingStore};

#[derive(Parser)]
#[command(name = "shorts-pipeline", about = "Turn channel videos into published shorts")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Path to the tracking state file
    #[arg(long, default_value = "tracking.json")]
    tracking: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the tracking state summary
    Status,
    /// Scrape the channel and merge new videos into the tracking state
    Scrape,
    /// Download the next actionable video
    Download,
    /// Split and compose the next downloaded video
    Process,
    /// Publish the composed segments of the next processed video
    Upload,
    /// Run one full cycle: scrape, then carry one video as far as possible
    Full,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(true)
                .with_target(true)
                .with_file(false)
                .with_line_number(false),
        )
        .with(env_filter)
        .init();

    let cli = Cli::parse();

    let config = PipelineConfig::load(&cli.config).await?;
    config.ensure_directories().await?;

    // Fail fast on missing tools before any state is touched
    if !matches!(cli.command, Command::Status | Command::Scrape) {
        shorts_media::check_ffmpeg()?;
        shorts_media::check_ffprobe()?;
        shorts_media::check_ytdlp()?;
    }

    let downloads_dir = config.paths.downloads.clone();
    let processed_dir = config.paths.processed.clone();
    let collaborators = Collaborators {
        scraper: Box::new(ChannelScraper::new()),
        downloader: Box::new(YtDlpDownloader::new(downloads_dir.clone())),
        splitter: Box::new(SegmentSplitter::new(processed_dir)),
        composer: Box::new(SegmentComposer::new(&config)?),
        uploader: Box::new(YouTubeUploader::new(config.upload.token_env.clone())),
        pacer: Box::new(TokioPacer),
    };

    let store = TrackingStore::new(&cli.tracking);
    let mut orchestrator = PipelineOrchestrator::open(config, store, collaborators).await?;

    match cli.command {
        Command::Status => print_report(&orchestrator.status_report()),
        Command::Scrape => {
            let stats = orchestrator.discover().await?;
            info!("Scrape done: {} new, {} refreshed", stats.inserted, stats.refreshed);
        }
        Command::Download => match orchestrator.select_next() {
            Some(id) => {
                let status = orchestrator.state().get(&id).map(|r| r.status);
                if status == Some(VideoStatus::Pending) {
                    orchestrator.advance_download(&id).await?;
                } else {
                    info!("{id} is already downloaded, nothing to fetch");
                }
            }
            None => info!("All tracked videos are completed"),
        },
        Command::Process => match orchestrator.select_next() {
            Some(id) => {
                let status = orchestrator.state().get(&id).map(|r| r.status);
                if status == Some(VideoStatus::Downloaded) {
                    let source = downloads_dir.join(format!("{id}.mp4"));
                    let edited = orchestrator.advance_process(&id, &source).await?;
                    info!("Composed {} segments for {id}", edited.len());
                } else {
                    warn!("{id} is not downloaded yet (status {:?})", status);
                }
            }
            None => info!("All tracked videos are completed"),
        },
        Command::Upload => match orchestrator.select_next() {
            Some(id) => {
                let status = orchestrator.state().get(&id).map(|r| r.status);
                if matches!(status, Some(VideoStatus::Processed) | Some(VideoStatus::Partial)) {
                    let segments = orchestrator.find_processed_segments(&id).await?;
                    if segments.is_empty() && orchestrator.claimed_parts(&id) > 0 {
                        warn!("{id}: composed segments are missing from disk, not publishing");
                    } else {
                        let outcome = orchestrator.advance_publish(&id, &segments).await?;
                        info!(
                            "Published {} of {} parts for {id}",
                            outcome.uploaded.len(),
                            segments.len()
                        );
                    }
                } else {
                    warn!("{id} is not processed yet (status {:?})", status);
                }
            }
            None => info!("All tracked videos are completed"),
        },
        Command::Full => orchestrator.run_full_cycle().await?,
    }

    Ok(())
}

fn print_report(report: &StatusReport) {
    println!("Channel: {}", report.channel_url);
    match report.last_discovery {
        Some(stamp) => println!("Last scrape: {}", stamp.format("%Y-%m-%d %H:%M UTC")),
        None => println!("Last scrape: never"),
    }
    println!("Tracked videos: {}", report.total);
    for (status, count) in &report.counts {
        println!("  {status}: {count}");
    }

    if !report.top_pending.is_empty() {
        println!("\nTop pending by views:");
        for line in &report.top_pending {
            println!(
                "  [{}] {} ({} views, {})",
                line.id, line.title, line.view_count, line.duration_label
            );
        }
    }

    if !report.recent_completed.is_empty() {
        println!("\nRecently completed:");
        for line in &report.recent_completed {
            let when = line
                .last_upload_at
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "  [{}] {} ({}/{} parts, {})",
                line.id, line.title, line.uploaded_parts, line.total_parts, when
            );
        }
    }
}
