// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, restore, shutdown.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use ack_adapters::{NoOpSink, SimulatedSink, TracedSink};
use ack_core::{AckConfig, AckCounters, AckTracker, ConfigError, SinkKind, SystemClock};
use ack_engine::{DirtyQueueFlusher, FlushStats, FlusherError, FlusherHandle};
use ack_storage::{LogError, LogSink, MaterializedRows, RowLog};
use fs2::FileExt;
use thiserror::Error;
use tracing::{info, warn};

use crate::sink::DaemonSink;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Tracker, flusher and sink settings
    pub settings: AckConfig,
    /// Directory for the lock file and the default row log
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
}

impl Config {
    pub fn new(settings: AckConfig, state_dir: &Path) -> Self {
        Self {
            settings,
            state_dir: state_dir.to_path_buf(),
            lock_path: state_dir.join("ackd.pid"),
        }
    }
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub tracker: Arc<AckTracker>,
    flusher: FlusherHandle,
    /// Name of the configured sink
    pub sink_name: &'static str,
    /// Entries loaded from the row log at startup
    pub restored: usize,
    pub start_time: Instant,
}

impl DaemonState {
    /// Wake the flusher now
    pub fn force_flush(&self) {
        self.flusher.force_flush();
    }

    pub fn flush_stats(&self) -> FlushStats {
        self.flusher.stats()
    }

    /// Give every dead-lettered key another attempt and flush right away
    pub fn requeue_dead_letters(&self) -> usize {
        let moved = self.tracker.requeue_dead_letters();
        if moved > 0 {
            self.flusher.force_flush();
        }
        moved
    }

    /// Stop the flusher after a final drain and release the lock
    pub async fn shutdown(self) -> Result<FlushStats, LifecycleError> {
        info!("Shutting down daemon...");

        let stats = self.flusher.shutdown().await?;

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            keys_flushed = stats.keys_flushed,
            dirty_left = self.tracker.dirty_len(),
            "Daemon shutdown complete"
        );
        Ok(stats)
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Row log error: {0}")]
    Log(#[from] LogError),

    #[error("Flusher error: {0}")]
    Flusher(#[from] FlusherError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    config.settings.validate()?;

    // 1. Create state directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents two daemons sharing a row log.
    // Failing here leaves another daemon's lock file untouched.
    let lock_file = acquire_lock(&config.lock_path)?;

    match startup_inner(config, lock_file) {
        Ok(state) => Ok(state),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

fn acquire_lock(lock_path: &Path) -> Result<File, LifecycleError> {
    use std::io::Write;

    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file, only once the lock is ours
    lock_file.set_len(0)?;
    let mut lock_file = lock_file;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

/// Inner startup logic - cleanup_on_failure called if this fails
fn startup_inner(config: &Config, lock_file: File) -> Result<DaemonState, LifecycleError> {
    // 3. Tracker with fresh counters
    let tracker = Arc::new(AckTracker::new(
        config.settings.tracker.clone(),
        Arc::new(AckCounters::new()),
        SystemClock,
    ));

    // 4. Sink; the log sink also restores durable rows into the tracker
    let (sink, restored) = open_sink(config, &tracker)?;
    let sink_name = sink.name();

    // 5. Flusher (LAST - only after restore so it never sees a half-loaded store)
    let flusher = DirtyQueueFlusher::spawn(
        Arc::clone(&tracker),
        TracedSink::new(sink),
        config.settings.flusher.clone(),
    );

    info!(
        sink = sink_name,
        restored,
        state_dir = %config.state_dir.display(),
        "Daemon started"
    );

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        tracker,
        flusher,
        sink_name,
        restored,
        start_time: Instant::now(),
    })
}

fn open_sink(
    config: &Config,
    tracker: &AckTracker,
) -> Result<(DaemonSink, usize), LifecycleError> {
    let sink_config = &config.settings.sink;
    match sink_config.kind {
        SinkKind::Log => {
            let path = sink_config
                .log_path
                .clone()
                .ok_or_else(|| ConfigError::Invalid {
                    field: "sink.log_path",
                    reason: "required when sink.kind = \"log\"".to_string(),
                })?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let (log, restored) = restore_from_log(&path, tracker)?;
            Ok((DaemonSink::Log(LogSink::new(log)), restored))
        }
        SinkKind::Simulated => Ok((DaemonSink::Simulated(SimulatedSink::new(sink_config)), 0)),
        SinkKind::Noop => Ok((DaemonSink::Noop(NoOpSink::new()), 0)),
    }
}

/// Replay the row log into the tracker, then compact it to one row per key
fn restore_from_log(path: &Path, tracker: &AckTracker) -> Result<(RowLog, usize), LifecycleError> {
    let rows = MaterializedRows::load(path)?;
    let restored = tracker.restore(rows.rows());

    let mut log = RowLog::open(path)?;
    if !rows.is_empty() {
        let seq = log.compact(rows.sorted_rows())?;
        info!(rows = rows.len(), seq, "Row log compacted");
    }
    Ok((log, restored))
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    // Remove PID/lock file
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
