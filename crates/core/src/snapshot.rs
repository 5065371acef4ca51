// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable read-state views returned to callers

use crate::entry::EntryState;
use crate::snowflake::timestamp_of;
use serde::{Deserialize, Serialize};

/// Entry state as seen by a snapshot; `Cold` means no entry exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotState {
    Cold,
    Clean,
    Dirty,
    Flushing,
}

impl SnapshotState {
    /// Numeric code: -1 cold, 0 clean, 1 dirty, 2 flushing
    pub fn code(&self) -> i8 {
        match self {
            SnapshotState::Cold => -1,
            SnapshotState::Clean => 0,
            SnapshotState::Dirty => 1,
            SnapshotState::Flushing => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SnapshotState::Cold => "COLD",
            SnapshotState::Clean => "CLEAN",
            SnapshotState::Dirty => "DIRTY",
            SnapshotState::Flushing => "FLUSHING",
        }
    }
}

impl From<EntryState> for SnapshotState {
    fn from(state: EntryState) -> Self {
        match state {
            EntryState::Clean => SnapshotState::Clean,
            EntryState::Dirty => SnapshotState::Dirty,
            EntryState::Flushing => SnapshotState::Flushing,
        }
    }
}

/// Point-in-time read state of one (user, channel)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadSnapshot {
    pub user_id: u64,
    pub channel_id: u64,
    pub last_read_message_id: u64,
    /// Highest message id seen in the channel (0 if none)
    pub channel_latest_message_id: u64,
    /// Approximation derived from id timestamps, not an exact count
    pub approx_unread_count: u32,
    pub mention_count: u32,
    /// `Flushing` may hide a newer value than the one in flight
    pub state: SnapshotState,
}

impl ReadSnapshot {
    pub fn is_cold(&self) -> bool {
        self.state == SnapshotState::Cold
    }
}

/// Compact per-entry view for listing many entries at once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySnapshot {
    pub user_id: u64,
    pub channel_id: u64,
    pub state: SnapshotState,
    pub mention_count: u32,
    pub approx_unread_count: u32,
}

/// Approximate unread messages between `last_read` and the channel `head`.
///
/// Message ids carry a millisecond timestamp, so the time between the two
/// ids divided by an assumed message gap gives a rough count, clamped to
/// `1..=cap` whenever the head is ahead. This avoids asking the durable
/// store for an exact count on every read.
pub fn approx_unread(last_read: u64, head: u64, ms_per_message: u64, cap: u32) -> u32 {
    if head == 0 || last_read >= head {
        return 0;
    }
    let ms_delta = timestamp_of(head).saturating_sub(timestamp_of(last_read));
    let estimate = ms_delta / ms_per_message.max(1);
    let cap = cap.max(1);
    u32::try_from(estimate).unwrap_or(u32::MAX).clamp(1, cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snowflake::{compose, EPOCH_MS};
    use yare::parameterized;

    fn id_at_secs(secs: u64) -> u64 {
        compose(EPOCH_MS + secs * 1_000, 1, 0)
    }

    #[parameterized(
        caught_up = { 10, 10, 0 },
        ahead_of_head = { 12, 10, 0 },
        thirty_seconds = { 10, 40, 30 },
        capped = { 0, 500, 99 },
    )]
    fn unread_approximation(last_read_secs: u64, head_secs: u64, expected: u32) {
        let unread = approx_unread(id_at_secs(last_read_secs), id_at_secs(head_secs), 1_000, 99);
        assert_eq!(unread, expected);
    }

    #[test]
    fn unknown_head_means_nothing_unread() {
        assert_eq!(approx_unread(id_at_secs(5), 0, 1_000, 99), 0);
    }

    #[test]
    fn newer_head_in_same_second_counts_at_least_one() {
        let last_read = id_at_secs(10);
        assert_eq!(approx_unread(last_read, last_read + 1, 1_000, 99), 1);
    }

    #[test]
    fn snapshot_state_codes_and_labels() {
        assert_eq!(SnapshotState::Cold.code(), -1);
        assert_eq!(SnapshotState::Flushing.code(), 2);
        assert_eq!(SnapshotState::from(EntryState::Dirty), SnapshotState::Dirty);
        assert_eq!(SnapshotState::Clean.label(), "CLEAN");
    }
}
