// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Counters and derived rates for write coalescing
//!
//! `AckCounters` is created at startup and handed to the tracker; the
//! operator-facing side reads it through `AckTracker::get_metrics`.

use crate::limits::UsageLevel;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic counters updated on the ack and flush paths
#[derive(Debug, Default)]
pub struct AckCounters {
    total_acks: AtomicU64,
    stale_acks: AtomicU64,
    new_entries: AtomicU64,
    durable_writes: AtomicU64,
    durable_batches: AtomicU64,
    flush_failures: AtomicU64,
    dead_lettered: AtomicU64,
}

impl AckCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_ack(&self) {
        self.total_acks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale(&self) {
        self.stale_acks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_new_entry(&self) {
        self.new_entries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_durable_batch(&self, keys: usize) {
        self.durable_writes.fetch_add(keys as u64, Ordering::Relaxed);
        self.durable_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush_failure(&self, keys: usize) {
        self.flush_failures.fetch_add(keys as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_dead_letter(&self) {
        self.dead_lettered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_acks(&self) -> u64 {
        self.total_acks.load(Ordering::Relaxed)
    }

    pub fn durable_writes(&self) -> u64 {
        self.durable_writes.load(Ordering::Relaxed)
    }
}

/// Window state between two `get_metrics` calls
#[derive(Debug)]
pub(crate) struct RateWindow {
    acks: u64,
    writes: u64,
    started: Instant,
}

impl RateWindow {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            acks: 0,
            writes: 0,
            started: now,
        }
    }

    /// Per-second rates since the window started, then restart the window
    pub(crate) fn advance(&mut self, now: Instant, acks: u64, writes: u64) -> (f64, f64) {
        let elapsed = now.saturating_duration_since(self.started);
        let rates = if elapsed > Duration::ZERO {
            let secs = elapsed.as_secs_f64();
            (
                acks.saturating_sub(self.acks) as f64 / secs,
                writes.saturating_sub(self.writes) as f64 / secs,
            )
        } else {
            (0.0, 0.0)
        };
        self.acks = acks;
        self.writes = writes;
        self.started = now;
        rates
    }
}

/// Point-in-time metrics for operators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckMetrics {
    pub total_acks: u64,
    pub stale_acks: u64,
    pub new_entries: u64,
    pub dirty_queue_depth: usize,
    pub entry_count: usize,
    pub durable_writes: u64,
    pub durable_batches: u64,
    pub flush_failures: u64,
    /// Keys currently parked after exhausting flush attempts
    pub dead_letters: usize,
    pub dead_lettered_total: u64,
    /// `total_acks / durable_writes`; 0 before the first durable write
    pub coalescing_ratio: f64,
    /// Acks per second since the previous call
    pub ack_rate: f64,
    /// Durable row writes per second since the previous call
    pub durable_write_rate: f64,
    pub entry_usage: UsageLevel,
}

pub(crate) struct Gauges {
    pub dirty_queue_depth: usize,
    pub entry_count: usize,
    pub dead_letters: usize,
    pub max_entries: usize,
}

impl AckMetrics {
    pub(crate) fn collect(
        counters: &AckCounters,
        window: &mut RateWindow,
        now: Instant,
        gauges: Gauges,
    ) -> Self {
        let total_acks = counters.total_acks();
        let durable_writes = counters.durable_writes();
        let (ack_rate, durable_write_rate) = window.advance(now, total_acks, durable_writes);
        let coalescing_ratio = if durable_writes > 0 {
            total_acks as f64 / durable_writes as f64
        } else {
            0.0
        };

        Self {
            total_acks,
            stale_acks: counters.stale_acks.load(Ordering::Relaxed),
            new_entries: counters.new_entries.load(Ordering::Relaxed),
            dirty_queue_depth: gauges.dirty_queue_depth,
            entry_count: gauges.entry_count,
            durable_writes,
            durable_batches: counters.durable_batches.load(Ordering::Relaxed),
            flush_failures: counters.flush_failures.load(Ordering::Relaxed),
            dead_letters: gauges.dead_letters,
            dead_lettered_total: counters.dead_lettered.load(Ordering::Relaxed),
            coalescing_ratio,
            ack_rate,
            durable_write_rate,
            entry_usage: UsageLevel::of(gauges.entry_count, gauges.max_entries),
        }
    }
}
