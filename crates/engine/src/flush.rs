// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single flush pass over the dirty set

use ack_adapters::StorageSink;
use ack_core::{AckTracker, Clock, FlusherConfig};

/// Outcome of one [`flush_pending`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Batch writes attempted
    pub batches: usize,
    pub keys_flushed: usize,
    pub keys_failed: usize,
    /// The pass ended early because a batch write failed
    pub stopped_on_failure: bool,
    /// The pass used its whole batch allowance
    pub hit_batch_limit: bool,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.batches == 0
    }
}

/// Drain the dirty set into `sink` in batches of `max_batch` keys.
///
/// Runs until a drain comes back empty, a batch write fails, or
/// `max_batches_per_pass` batches have been attempted. Keys from a failed
/// batch are requeued (or dead-lettered) by the tracker and wait for the
/// next pass, so a sink that keeps failing cannot spin this loop.
pub async fn flush_pending<C: Clock, S: StorageSink>(
    tracker: &AckTracker<C>,
    sink: &S,
    config: &FlusherConfig,
) -> FlushReport {
    let mut report = FlushReport::default();

    while report.batches < config.max_batches_per_pass {
        let batch = tracker.drain_dirty_batch(config.max_batch);
        if batch.is_empty() {
            return report;
        }
        let rows = tracker.rows_for(&batch);
        report.batches += 1;

        match sink.batch_write(&rows).await {
            Ok(()) => {
                tracker.on_flush_success(&batch);
                report.keys_flushed += batch.len();
            }
            Err(e) => {
                tracker.on_flush_failure(&batch);
                report.keys_failed += batch.len();
                report.stopped_on_failure = true;
                tracing::warn!(keys = batch.len(), error = %e, "batch write failed, keys requeued");
                return report;
            }
        }
    }

    report.hit_batch_limit = true;
    tracing::debug!(
        batches = report.batches,
        remaining = tracker.dirty_len(),
        "flush pass hit batch limit"
    );
    report
}

#[cfg(test)]
#[path = "flush_tests.rs"]
mod tests;
