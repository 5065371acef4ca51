// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock-free read state for a single (user, channel) pair
//!
//! `last_read_message_id` only ever moves forward. Concurrent acks from
//! several devices of the same user race through a CAS loop: the highest
//! id wins and every caller either lands its write or observes a higher
//! value already present.
//!
//! The flush state machine:
//!
//! ```text
//!   Clean --change--> Dirty --try_begin_flush--> Flushing --mark_clean--> Clean
//!                       ^                            |
//!                       +--mark_dirty_after_failure--+
//! ```
//!
//! A change that lands while a flush is in flight leaves the state at
//! `Flushing` (the flush keeps a single owner) and bumps the revision;
//! `mark_clean` notices the newer revision and returns the entry to `Dirty`.

use crate::key::{AckKey, ReadStateRow};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};

/// Flush state of an entry relative to the durable store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum EntryState {
    /// Matches the durable store
    Clean = 0,
    /// Ahead of the durable store
    Dirty = 1,
    /// A batch write is in flight
    Flushing = 2,
}

impl EntryState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => EntryState::Clean,
            1 => EntryState::Dirty,
            _ => EntryState::Flushing,
        }
    }
}

const CLEAN: u8 = EntryState::Clean as u8;
const DIRTY: u8 = EntryState::Dirty as u8;
const FLUSHING: u8 = EntryState::Flushing as u8;

/// Mutable read state owned by the tracker's map
#[derive(Debug)]
pub struct ReadStateEntry {
    key: AckKey,
    last_read_message_id: AtomicU64,
    mention_count: AtomicU32,
    state: AtomicU8,
    /// Bumped on every change; compared against `flush_revision` on success
    revision: AtomicU64,
    flush_revision: AtomicU64,
    flush_failures: AtomicU32,
    created_at: Instant,
    /// Nanoseconds after `created_at` of the last successful advance
    last_updated_nanos: AtomicU64,
}

impl ReadStateEntry {
    /// A brand-new entry: nothing read yet and not durably persisted, so `Dirty`
    pub fn new(key: AckKey, now: Instant) -> Self {
        Self::with_values(key, 0, 0, EntryState::Dirty, now)
    }

    /// An entry loaded from the durable store, already `Clean`
    pub fn restored(row: &ReadStateRow, now: Instant) -> Self {
        Self::with_values(
            row.key,
            row.last_read_message_id,
            row.mention_count,
            EntryState::Clean,
            now,
        )
    }

    fn with_values(
        key: AckKey,
        last_read: u64,
        mentions: u32,
        state: EntryState,
        now: Instant,
    ) -> Self {
        Self {
            key,
            last_read_message_id: AtomicU64::new(last_read),
            mention_count: AtomicU32::new(mentions),
            state: AtomicU8::new(state as u8),
            revision: AtomicU64::new(0),
            flush_revision: AtomicU64::new(0),
            flush_failures: AtomicU32::new(0),
            created_at: now,
            last_updated_nanos: AtomicU64::new(0),
        }
    }

    pub fn key(&self) -> AckKey {
        self.key
    }

    pub fn last_read_message_id(&self) -> u64 {
        self.last_read_message_id.load(Ordering::Acquire)
    }

    pub fn mention_count(&self) -> u32 {
        self.mention_count.load(Ordering::Acquire)
    }

    pub fn state(&self) -> EntryState {
        EntryState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Consecutive failed flush attempts since the last successful one
    pub fn flush_failures(&self) -> u32 {
        self.flush_failures.load(Ordering::Acquire)
    }

    /// Instant of the last successful advance (creation time if none yet)
    pub fn last_updated(&self) -> Instant {
        self.created_at + Duration::from_nanos(self.last_updated_nanos.load(Ordering::Relaxed))
    }

    /// Current values as a row for the durable store
    pub fn row(&self) -> ReadStateRow {
        ReadStateRow {
            key: self.key,
            last_read_message_id: self.last_read_message_id(),
            mention_count: self.mention_count(),
        }
    }

    /// Advance the read pointer to `new_id` if it is strictly newer.
    ///
    /// Returns false, touching nothing, when `new_id <= current`.
    pub fn try_advance(&self, new_id: u64) -> bool {
        self.try_advance_at(new_id, Instant::now())
    }

    /// `try_advance` with an explicit timestamp for `last_updated`
    pub fn try_advance_at(&self, new_id: u64, now: Instant) -> bool {
        let mut current = self.last_read_message_id.load(Ordering::Acquire);
        loop {
            if new_id <= current {
                return false;
            }
            match self.last_read_message_id.compare_exchange_weak(
                current,
                new_id,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        // Only the CAS winner gets here, so the dirty transition fires once
        self.note_change();
        let nanos = now.saturating_duration_since(self.created_at).as_nanos();
        self.last_updated_nanos
            .fetch_max(u64::try_from(nanos).unwrap_or(u64::MAX), Ordering::Relaxed);
        true
    }

    /// Add mentions; a new mention is itself an unflushed fact
    pub fn add_mentions(&self, delta: u32) {
        if delta == 0 {
            return;
        }
        // Saturating add via CAS so a runaway counter cannot wrap to zero
        let mut current = self.mention_count.load(Ordering::Acquire);
        loop {
            let next = current.saturating_add(delta);
            match self.mention_count.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        self.note_change();
    }

    /// Remove up to `count` mentions, flooring at zero. Returns the previous count.
    pub fn clear_mentions(&self, count: u32) -> u32 {
        let mut current = self.mention_count.load(Ordering::Acquire);
        loop {
            let next = current.saturating_sub(count);
            if next == current {
                return current;
            }
            match self.mention_count.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.note_change();
                    return current;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Claim this entry for a flush. True for exactly one caller per dirty generation.
    pub fn try_begin_flush(&self) -> bool {
        let claimed = self
            .state
            .compare_exchange(DIRTY, FLUSHING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if claimed {
            self.flush_revision
                .store(self.revision.load(Ordering::SeqCst), Ordering::SeqCst);
        }
        claimed
    }

    /// Finish a confirmed durable write.
    ///
    /// Returns true when the entry is now `Clean`. Returns false when a change
    /// landed while the write was in flight: the entry is `Dirty` again and the
    /// caller must queue it for another flush.
    pub fn mark_clean(&self) -> bool {
        if self
            .state
            .compare_exchange(FLUSHING, CLEAN, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return self.state() == EntryState::Clean;
        }
        self.flush_failures.store(0, Ordering::Release);

        if self.revision.load(Ordering::SeqCst) == self.flush_revision.load(Ordering::SeqCst) {
            return true;
        }
        // Lost the CAS only if a concurrent change already re-dirtied it
        let _ = self
            .state
            .compare_exchange(CLEAN, DIRTY, Ordering::SeqCst, Ordering::SeqCst);
        false
    }

    /// Return a failed flush to `Dirty`. No-op unless currently `Flushing`.
    pub fn mark_dirty_after_failure(&self) -> bool {
        self.state
            .compare_exchange(FLUSHING, DIRTY, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Count a failed flush attempt, returning the new consecutive total
    pub fn record_flush_failure(&self) -> u32 {
        self.flush_failures.fetch_add(1, Ordering::AcqRel).saturating_add(1)
    }

    /// Bump the revision, then move `Clean -> Dirty`.
    ///
    /// `Dirty` stays dirty; `Flushing` is left alone so the in-flight flush
    /// keeps sole ownership, and `mark_clean` picks up the newer revision.
    fn note_change(&self) {
        self.revision.fetch_add(1, Ordering::SeqCst);
        let _ = self
            .state
            .compare_exchange(CLEAN, DIRTY, Ordering::SeqCst, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
