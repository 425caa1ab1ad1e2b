// Drives the attic_watch engine from a recorded detection feed.
//
// Usage: attic_supervisor [--config attic.toml] [--detections feed.jsonl] [--snapshot-dir DIR]

mod actions;
mod config;
mod error;
mod render;
mod source;

use actions::{CommandDeterrent, Deterrent, LogDeterrent, SnapshotQueue, SnapshotWriter};
use anyhow::Context;
use attic_watch::{GatedAction, SharedEngine};
use clap::Parser;
use config::SupervisorConfig;
use source::{DetectionSource, FrameBatch, ReplaySource};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const FEED_BUFFER: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "attic_supervisor")]
#[command(about = "Watches a detection feed for attic activity, suggests trap placements and infers accessways")]
struct Args {
    /// TOML config file; every setting has a default
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON Lines detection feed (overrides config and ATTIC_DETECTIONS)
    #[arg(short, long)]
    detections: Option<PathBuf>,

    /// Directory for annotated snapshots (overrides config and ATTIC_SNAPSHOT_DIR)
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Never play the deterrent sound
    #[arg(long)]
    no_sound: bool,

    /// Never write snapshots
    #[arg(long)]
    no_snapshots: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    // --- 1. Frame geometry & background ---
    let background = match &config.snapshots.background {
        Some(path) => image::open(path)
            .with_context(|| format!("loading background {}", path.display()))?
            .to_rgba8(),
        None => render::blank_canvas(config.engine.frame_width, config.engine.frame_height),
    };
    let (frame_width, frame_height) = background.dimensions();
    let background = Arc::new(background);

    // --- 2. Engine ---
    let engine_config = config.engine.to_engine_config(frame_width, frame_height);
    let anchor = engine_config.anchor;
    let max_trap_placements = engine_config.max_trap_placements;
    let shared = SharedEngine::new(engine_config);

    // --- 3. Collaborators ---
    let mut deterrent = build_deterrent(&config);
    let snapshots = if config.snapshots.enabled {
        Some(SnapshotWriter::new(&config.snapshots.dir).context("preparing snapshot directory")?)
    } else {
        None
    };

    // --- 4. Feed ---
    let (tx, mut rx) = mpsc::channel::<FrameBatch>(FEED_BUFFER);
    let feed_path = config.source.detections.clone();
    let min_confidence = config.source.min_confidence;
    tracing::info!(feed = %feed_path.display(), "replaying detection feed");
    let feed = tokio::task::spawn_blocking(move || -> error::Result<u64> {
        let mut source = ReplaySource::open(&feed_path, min_confidence)?;
        let mut frames = 0;
        while let Some(batch) = source.next_batch()? {
            if tx.blocking_send(batch).is_err() {
                break;
            }
            frames += 1;
        }
        Ok(frames)
    });

    // --- 5. Main Processing Loop ---
    let stream_start = Instant::now();
    let mut pending_snapshots = SnapshotQueue::new();
    while let Some(batch) = rx.recv().await {
        let now = stream_start
            .checked_add(batch.timestamp)
            .with_context(|| format!("frame {} timestamp {:?} is out of range", batch.frame_id, batch.timestamp))?;
        let report = shared.on_detection_batch(&batch.detections, now).await;

        if report.fired(GatedAction::SoundTrigger) {
            if let Err(e) = deterrent.trigger() {
                tracing::warn!(error = %e, "deterrent failed");
            }
        }

        if report.fired(GatedAction::Snapshot) {
            if let Some(writer) = &snapshots {
                let writer = writer.clone();
                let background = Arc::clone(&background);
                let frame_id = batch.frame_id;
                pending_snapshots.spawn(move || {
                    let frame = render::render_overlay(
                        &background,
                        &report,
                        &batch.detections,
                        anchor,
                        max_trap_placements,
                    );
                    writer.save(frame_id, &frame)
                });
            }
        }

        pending_snapshots.reap();
    }

    let frames = feed
        .await
        .context("detection feed task panicked")?
        .context("reading detection feed")?;

    pending_snapshots.finish().await;

    // --- 6. Summary ---
    let summary = shared.summary().await;
    tracing::info!(
        frames,
        detections = summary.total_observed,
        retained = summary.history_len,
        snapshots = pending_snapshots.saved(),
        snapshot_failures = pending_snapshots.failed(),
        "feed complete"
    );
    for (rank, placement) in summary.trap_placements.iter().take(max_trap_placements).enumerate() {
        let zone = placement.zone;
        tracing::info!(
            rank = rank + 1,
            hits = placement.trigger_count,
            "trap placement ({}, {}) - ({}, {})",
            zone.x1,
            zone.y1,
            zone.x2,
            zone.y2
        );
    }
    for zone in &summary.accessways {
        tracing::info!("accessway ({}, {}) - ({}, {})", zone.x1, zone.y1, zone.x2, zone.y2);
    }

    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<SupervisorConfig> {
    let mut config = match &args.config {
        Some(path) => SupervisorConfig::load(path)?,
        None => SupervisorConfig::default(),
    };
    config.apply_env();

    if let Some(path) = &args.detections {
        config.source.detections = path.clone();
    }
    if let Some(dir) = &args.snapshot_dir {
        config.snapshots.dir = dir.clone();
    }
    if args.no_sound {
        config.deterrent.enabled = false;
    }
    if args.no_snapshots {
        config.snapshots.enabled = false;
    }
    Ok(config)
}

fn build_deterrent(config: &SupervisorConfig) -> Box<dyn Deterrent> {
    match (&config.deterrent.sound_file, config.deterrent.enabled) {
        (Some(sound), true) => Box::new(CommandDeterrent::new(config.deterrent.command.clone(), sound.clone())),
        _ => Box::new(LogDeterrent::default()),
    }
}
