// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ack Tracker Daemon (ackd)
//!
//! Applies a JSON-lines feed of acks, messages and mentions to an in-memory
//! tracker while a background flusher writes coalesced rows to the sink.

use std::path::Path;

use ack_core::{AckTracker, SnowflakeIdGen};
use ack_daemon::feed::{apply_line, FeedSource, FeedStats};
use ack_daemon::{startup, Args, LifecycleError};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Set up logging first so config and startup failures are recorded
    let _log_guard = setup_logging(args.log_file.as_deref())?;

    let config = match args.to_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    let ids = match SnowflakeIdGen::new(args.node_id) {
        Ok(ids) => ids,
        Err(e) => {
            error!("Invalid node id: {}", e);
            return Err(e.into());
        }
    };

    let mut feed = if args.reads_stdin() {
        FeedSource::stdin()
    } else {
        FeedSource::open(&args.feed, args.follow).await?
    };

    let daemon = match startup(&config).await {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to start daemon: {}", e);
            return Err(e.into());
        }
    };

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    let mut metrics = args.metrics_interval().map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });

    info!(
        feed = %args.feed.display(),
        follow = args.follow,
        "Daemon ready"
    );

    let mut stats = FeedStats::default();
    loop {
        tokio::select! {
            line = feed.next_line() => match line {
                Ok(Some(line)) => apply_line(&line, &daemon.tracker, &ids, &mut stats),
                Ok(None) => {
                    info!("Feed exhausted, shutting down...");
                    break;
                }
                Err(e) => {
                    error!("Feed read failed, shutting down: {}", e);
                    break;
                }
            },

            _ = tick(&mut metrics) => report_metrics(&daemon.tracker, &stats),

            // Operator asks for another attempt at dead-lettered keys
            _ = sighup.recv() => {
                let moved = daemon.requeue_dead_letters();
                info!(moved, "Received SIGHUP, requeued dead letters");
            }

            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
        }
    }

    report_metrics(&daemon.tracker, &stats);
    daemon.shutdown().await?;

    info!("Daemon stopped");
    Ok(())
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn report_metrics(tracker: &AckTracker, feed: &FeedStats) {
    let m = tracker.get_metrics();
    info!(
        total_acks = m.total_acks,
        stale_acks = m.stale_acks,
        durable_writes = m.durable_writes,
        coalescing_ratio = m.coalescing_ratio,
        ack_rate = m.ack_rate,
        durable_write_rate = m.durable_write_rate,
        dirty = m.dirty_queue_depth,
        entries = m.entry_count,
        rejected_lines = feed.rejected,
        stamped_messages = feed.stamped,
        "metrics"
    );
    if m.entry_usage.is_concerning() {
        warn!(
            entries = m.entry_count,
            usage = ?m.entry_usage,
            "entry count approaching max_entries"
        );
    }
    if m.dead_letters > 0 {
        warn!(
            dead_letters = m.dead_letters,
            "keys parked after repeated flush failures (SIGHUP requeues them)"
        );
    }
}

fn setup_logging(
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("log file has no file name: {}", path.display()),
        )
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(Some(guard))
}
