// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background task that periodically drains the dirty set
//!
//! The task wakes on a fixed interval (missed ticks are skipped, not
//! replayed), on [`FlusherHandle::force_flush`], or on shutdown. Each wake
//! runs one [`flush_pending`] pass. Shutdown stops the schedule, runs a
//! final pass, and returns the accumulated [`FlushStats`].
//!
//! There is no backoff of its own: keys from a failed batch go back to the
//! dirty set and are retried on the next wake.

use crate::error::FlusherError;
use crate::flush::{flush_pending, FlushReport};
use ack_adapters::StorageSink;
use ack_core::{AckTracker, Clock, FlusherConfig};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Totals across every pass the flusher has run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Passes that attempted at least one batch
    pub passes: u64,
    pub batches: u64,
    pub keys_flushed: u64,
    pub keys_failed: u64,
}

impl FlushStats {
    fn record(&mut self, report: &FlushReport) {
        self.passes += 1;
        self.batches += report.batches as u64;
        self.keys_flushed += report.keys_flushed as u64;
        self.keys_failed += report.keys_failed as u64;
    }
}

/// Spawns the flush loop
pub struct DirtyQueueFlusher;

impl DirtyQueueFlusher {
    /// Start the flush loop on the current tokio runtime
    pub fn spawn<C, S>(tracker: Arc<AckTracker<C>>, sink: S, config: FlusherConfig) -> FlusherHandle
    where
        C: Clock,
        S: StorageSink,
    {
        let force = Arc::new(Notify::new());
        let stats = Arc::new(Mutex::new(FlushStats::default()));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tracing::info!(
            interval = ?config.flush_interval,
            max_batch = config.max_batch,
            "flusher started"
        );

        let task = tokio::spawn(run(
            tracker,
            sink,
            config,
            Arc::clone(&force),
            Arc::clone(&stats),
            shutdown_rx,
        ));

        FlusherHandle {
            force,
            stats,
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Control handle for a running flusher.
///
/// Dropping the handle without calling [`shutdown`](Self::shutdown) also
/// stops the loop after a final pass, but nothing waits for it.
pub struct FlusherHandle {
    force: Arc<Notify>,
    stats: Arc<Mutex<FlushStats>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<FlushStats>,
}

impl FlusherHandle {
    /// Wake the loop now instead of at the next tick
    pub fn force_flush(&self) {
        self.force.notify_one();
    }

    /// Totals so far
    pub fn stats(&self) -> FlushStats {
        *self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stop the schedule, run a final pass, and wait for the task to exit
    pub async fn shutdown(mut self) -> Result<FlushStats, FlusherError> {
        if let Some(tx) = self.shutdown.take() {
            // The loop may already be gone; joining reports why
            let _ = tx.send(());
        }
        Ok(self.task.await?)
    }
}

async fn run<C: Clock, S: StorageSink>(
    tracker: Arc<AckTracker<C>>,
    sink: S,
    config: FlusherConfig,
    force: Arc<Notify>,
    stats: Arc<Mutex<FlushStats>>,
    mut shutdown: oneshot::Receiver<()>,
) -> FlushStats {
    let period = config.flush_interval;
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            // Fires on send and on a dropped handle
            _ = &mut shutdown => break,
            _ = force.notified() => {
                tracing::debug!("forced flush");
            }
            _ = interval.tick() => {}
        }

        let report = flush_pending(&tracker, &sink, &config).await;
        record(&stats, &report);
        if report.keys_flushed > 0 {
            tracing::info!(
                keys = report.keys_flushed,
                batches = report.batches,
                "flushed dirty entries"
            );
        }
    }

    tracing::info!(dirty = tracker.dirty_len(), "flusher stopping, final drain");
    let mut flushed = 0;
    loop {
        let report = flush_pending(&tracker, &sink, &config).await;
        record(&stats, &report);
        flushed += report.keys_flushed;
        // Keep going only while passes end on their batch limit
        if !report.hit_batch_limit {
            break;
        }
    }

    let remaining = tracker.dirty_len();
    if remaining > 0 {
        tracing::warn!(remaining, "keys still dirty after final drain");
    } else {
        tracing::info!(keys = flushed, "final drain complete");
    }

    *stats.lock().unwrap_or_else(|e| e.into_inner())
}

fn record(stats: &Mutex<FlushStats>, report: &FlushReport) {
    if report.is_empty() {
        return;
    }
    stats
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .record(report);
}

#[cfg(test)]
#[path = "flusher_tests.rs"]
mod tests;
