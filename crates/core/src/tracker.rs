// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory read-state store with write coalescing
//!
//! Producers call [`AckTracker::ack`] at any rate. Each ack touches one
//! entry and inserts its key into the dirty set; a key acked a thousand
//! times between flushes sits in the set once, so the flusher writes it
//! once. The dirty set is the coalescing mechanism.
//!
//! Flush protocol (driven by the engine's flusher):
//!
//! 1. [`drain_dirty_batch`](AckTracker::drain_dirty_batch) takes keys out
//!    of the dirty set and claims them (`Dirty -> Flushing`)
//! 2. [`rows_for`](AckTracker::rows_for) captures the values to persist
//! 3. the caller writes the rows to its sink
//! 4. [`on_flush_success`](AckTracker::on_flush_success) or
//!    [`on_flush_failure`](AckTracker::on_flush_failure) settles the batch

use crate::clock::{Clock, SystemClock};
use crate::config::TrackerConfig;
use crate::entry::{EntryState, ReadStateEntry};
use crate::key::{AckCommand, AckKey, AckResult, ReadStateRow};
use crate::metrics::{AckCounters, AckMetrics, Gauges, RateWindow};
use crate::snapshot::{approx_unread, EntrySnapshot, ReadSnapshot, SnapshotState};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Concurrent store of read state, channel heads and pending flushes
pub struct AckTracker<C: Clock = SystemClock> {
    states: DashMap<AckKey, Arc<ReadStateEntry>>,
    dirty: DashSet<AckKey>,
    dead_letters: DashSet<AckKey>,
    /// Highest message id observed per channel
    channel_heads: DashMap<u64, u64>,
    config: TrackerConfig,
    counters: Arc<AckCounters>,
    clock: C,
    window: Mutex<RateWindow>,
    capacity_warned: AtomicBool,
}

impl AckTracker<SystemClock> {
    /// Tracker with default settings, fresh counters and the system clock
    pub fn with_defaults() -> Self {
        Self::new(
            TrackerConfig::default(),
            Arc::new(AckCounters::new()),
            SystemClock,
        )
    }
}

impl<C: Clock> AckTracker<C> {
    pub fn new(config: TrackerConfig, counters: Arc<AckCounters>, clock: C) -> Self {
        let window = Mutex::new(RateWindow::new(clock.now()));
        Self {
            states: DashMap::new(),
            dirty: DashSet::new(),
            dead_letters: DashSet::new(),
            channel_heads: DashMap::new(),
            config,
            counters,
            clock,
            window,
            capacity_warned: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn counters(&self) -> &Arc<AckCounters> {
        &self.counters
    }

    /// Record that a user has read a channel up to `cmd.message_id`.
    ///
    /// Never blocks on I/O. A stale ack (not newer than the stored id)
    /// changes nothing and returns [`AckResult::Stale`].
    pub fn ack(&self, cmd: AckCommand) -> AckResult {
        self.counters.record_ack();
        let key = cmd.key();
        let now = self.clock.now();

        let (entry, created) = self.get_or_create(key);
        if created {
            entry.try_advance_at(cmd.message_id, now);
            if cmd.mention_delta > 0 {
                entry.add_mentions(cmd.mention_delta.unsigned_abs());
            }
            self.counters.record_new_entry();
            self.enqueue(key);
            return AckResult::Created;
        }

        if !entry.try_advance_at(cmd.message_id, now) {
            self.counters.record_stale();
            return AckResult::Stale;
        }
        if cmd.mention_delta < 0 {
            entry.clear_mentions(cmd.mention_delta.unsigned_abs());
        }
        self.enqueue(key);
        AckResult::Advanced
    }

    /// Track the newest message id of a channel (monotonic max)
    pub fn on_new_message(&self, channel_id: u64, message_id: u64) {
        self.channel_heads
            .entry(channel_id)
            .and_modify(|head| *head = (*head).max(message_id))
            .or_insert(message_id);
    }

    /// Record `count` new mentions of a user in a channel
    pub fn on_mention(&self, user_id: u64, channel_id: u64, count: u32) {
        if count == 0 {
            return;
        }
        let key = AckKey::new(user_id, channel_id);
        let (entry, created) = self.get_or_create(key);
        if created {
            self.counters.record_new_entry();
        }
        entry.add_mentions(count);
        self.enqueue(key);
    }

    /// Read state of one (user, channel); unknown keys yield a `Cold` snapshot.
    ///
    /// `approx_unread_count` is estimated from message-id timestamps and is
    /// not an exact count. A `Flushing` state only says a write is in flight:
    /// an ack that landed during it is already visible here but not yet part
    /// of that write, and gets flushed in a later pass.
    pub fn get_snapshot(&self, user_id: u64, channel_id: u64) -> ReadSnapshot {
        let head = self.channel_head(channel_id);
        let entry = self.entry(&AckKey::new(user_id, channel_id));
        let (last_read, mentions, state) = match &entry {
            Some(entry) => (
                entry.last_read_message_id(),
                entry.mention_count(),
                SnapshotState::from(entry.state()),
            ),
            None => (0, 0, SnapshotState::Cold),
        };

        ReadSnapshot {
            user_id,
            channel_id,
            last_read_message_id: last_read,
            channel_latest_message_id: head,
            approx_unread_count: self.unread(last_read, head),
            mention_count: mentions,
            state,
        }
    }

    /// Take up to `limit` dirty keys and claim each for flushing.
    ///
    /// A key is returned only if this caller removed it from the dirty set
    /// and won `Dirty -> Flushing`. Keys whose claim fails are dropped: they
    /// are either clean already or owned by an in-flight flush that will
    /// requeue them. Failed claims do not count toward `limit`; the walk
    /// continues until the batch is full or the dirty set is exhausted.
    pub fn drain_dirty_batch(&self, limit: usize) -> Vec<AckKey> {
        let mut batch = Vec::with_capacity(limit.min(self.dirty.len()));
        while batch.len() < limit {
            // Collect first; removing while iterating would deadlock on the shard
            let candidates: Vec<AckKey> = self
                .dirty
                .iter()
                .take(limit - batch.len())
                .map(|k| *k)
                .collect();
            if candidates.is_empty() {
                break;
            }
            // Every candidate leaves the dirty set below, so each round makes progress
            for key in candidates {
                if self.dirty.remove(&key).is_none() {
                    continue;
                }
                match self.entry(&key) {
                    Some(entry) if entry.try_begin_flush() => batch.push(key),
                    _ => {}
                }
            }
        }
        batch
    }

    /// Rows to persist for a drained batch, captured now
    pub fn rows_for(&self, keys: &[AckKey]) -> Vec<ReadStateRow> {
        keys.iter()
            .filter_map(|key| self.entry(key).map(|entry| entry.row()))
            .collect()
    }

    /// Settle a batch the sink confirmed as durable
    pub fn on_flush_success(&self, keys: &[AckKey]) {
        let mut requeued = 0usize;
        for key in keys {
            let Some(entry) = self.entry(key) else {
                continue;
            };
            // False means the entry changed mid-flight and is Dirty again
            if !entry.mark_clean() && entry.state() == EntryState::Dirty {
                self.dirty.insert(*key);
                requeued += 1;
            }
        }
        self.counters.record_durable_batch(keys.len());
        tracing::debug!(keys = keys.len(), requeued, "flush confirmed");
    }

    /// Settle a batch the sink rejected: requeue, or park keys out of attempts
    pub fn on_flush_failure(&self, keys: &[AckKey]) {
        let max_attempts = self.config.max_flush_attempts;
        let mut parked = 0usize;
        for key in keys {
            let Some(entry) = self.entry(key) else {
                continue;
            };
            entry.mark_dirty_after_failure();
            let attempts = entry.record_flush_failure();
            if max_attempts > 0 && attempts >= max_attempts {
                self.dead_letters.insert(*key);
                self.counters.record_dead_letter();
                parked += 1;
                tracing::error!(%key, attempts, "flush attempts exhausted, key dead-lettered");
            } else {
                self.dirty.insert(*key);
            }
        }
        self.counters.record_flush_failure(keys.len());
        tracing::warn!(
            keys = keys.len(),
            requeued = keys.len() - parked,
            parked,
            "flush failed"
        );
    }

    /// Move every dead-lettered key back to the dirty set. Returns how many moved.
    ///
    /// A revived key keeps its failure count, so it gets one more attempt
    /// before being parked again unless a flush succeeds.
    pub fn requeue_dead_letters(&self) -> usize {
        let parked: Vec<AckKey> = self.dead_letters.iter().map(|k| *k).collect();
        let mut moved = 0;
        for key in parked {
            if self.dead_letters.remove(&key).is_some() {
                self.dirty.insert(key);
                moved += 1;
            }
        }
        if moved > 0 {
            tracing::info!(moved, "dead letters requeued");
        }
        moved
    }

    /// Load rows from the durable store as `Clean` entries.
    ///
    /// An existing entry is never lowered; a row ahead of it advances the
    /// entry, which then needs a flush like any other change.
    pub fn restore<'a>(&self, rows: impl IntoIterator<Item = &'a ReadStateRow>) -> usize {
        let now = self.clock.now();
        let mut restored = 0;
        for row in rows {
            match self.states.entry(row.key) {
                Entry::Vacant(vacant) => {
                    vacant.insert(Arc::new(ReadStateEntry::restored(row, now)));
                    restored += 1;
                }
                Entry::Occupied(occupied) => {
                    let entry = Arc::clone(occupied.get());
                    drop(occupied);
                    if entry.try_advance_at(row.last_read_message_id, now) {
                        self.enqueue(row.key);
                    }
                }
            }
        }
        self.check_capacity();
        restored
    }

    /// Totals, rates since the previous call, and gauges
    pub fn get_metrics(&self) -> AckMetrics {
        let gauges = Gauges {
            dirty_queue_depth: self.dirty.len(),
            entry_count: self.states.len(),
            dead_letters: self.dead_letters.len(),
            max_entries: self.config.max_entries,
        };
        let mut window = self.window.lock().unwrap_or_else(|e| e.into_inner());
        AckMetrics::collect(&self.counters, &mut window, self.clock.now(), gauges)
    }

    /// Compact views of up to `limit` entries, in no particular order
    pub fn entry_snapshots(&self, limit: usize) -> Vec<EntrySnapshot> {
        let entries: Vec<Arc<ReadStateEntry>> = self
            .states
            .iter()
            .take(limit)
            .map(|item| Arc::clone(item.value()))
            .collect();

        entries
            .into_iter()
            .map(|entry| {
                let key = entry.key();
                let head = self.channel_head(key.channel_id);
                EntrySnapshot {
                    user_id: key.user_id,
                    channel_id: key.channel_id,
                    state: SnapshotState::from(entry.state()),
                    mention_count: entry.mention_count(),
                    approx_unread_count: self.unread(entry.last_read_message_id(), head),
                }
            })
            .collect()
    }

    /// Number of tracked entries
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of keys waiting in the dirty set
    pub fn dirty_len(&self) -> usize {
        self.dirty.len()
    }

    pub fn is_dirty(&self, key: &AckKey) -> bool {
        self.dirty.contains(key)
    }

    pub fn dead_letter_len(&self) -> usize {
        self.dead_letters.len()
    }

    pub fn is_dead_lettered(&self, key: &AckKey) -> bool {
        self.dead_letters.contains(key)
    }

    pub fn entry(&self, key: &AckKey) -> Option<Arc<ReadStateEntry>> {
        self.states.get(key).map(|item| Arc::clone(item.value()))
    }

    /// Highest message id seen in a channel, 0 if none
    pub fn channel_head(&self, channel_id: u64) -> u64 {
        self.channel_heads
            .get(&channel_id)
            .map(|head| *head)
            .unwrap_or(0)
    }

    /// Fetch an entry, creating it if absent. Exactly one concurrent caller
    /// sees `created == true` for a given key.
    fn get_or_create(&self, key: AckKey) -> (Arc<ReadStateEntry>, bool) {
        if let Some(entry) = self.entry(&key) {
            return (entry, false);
        }
        let (entry, created) = match self.states.entry(key) {
            Entry::Occupied(occupied) => (Arc::clone(occupied.get()), false),
            Entry::Vacant(vacant) => {
                let entry = Arc::new(ReadStateEntry::new(key, self.clock.now()));
                vacant.insert(Arc::clone(&entry));
                (entry, true)
            }
        };
        if created {
            self.check_capacity();
        }
        (entry, created)
    }

    /// Queue a changed key for flushing; a change also revives a parked key
    fn enqueue(&self, key: AckKey) {
        self.dirty.insert(key);
        self.dead_letters.remove(&key);
    }

    fn check_capacity(&self) {
        let entries = self.states.len();
        if entries > self.config.max_entries && !self.capacity_warned.swap(true, Ordering::Relaxed)
        {
            tracing::warn!(
                entries,
                max_entries = self.config.max_entries,
                "entry count above advisory limit; entries are never evicted"
            );
        }
    }

    fn unread(&self, last_read: u64, head: u64) -> u32 {
        approx_unread(
            last_read,
            head,
            self.config.unread_ms_per_message,
            self.config.unread_cap,
        )
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
