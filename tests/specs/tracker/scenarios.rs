// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ack ordering, drain and flush outcomes on a single key

use crate::prelude::tracker;
use ack_core::{AckCommand, AckKey, AckResult, EntryState, SnapshotState};
use similar_asserts::assert_eq;

const KEY: AckKey = AckKey::new(1, 1);

#[test]
fn first_ack_creates_dirty_entry() {
    let tracker = tracker();

    let result = tracker.ack(AckCommand::new(1, 1, 100, 0));

    assert_eq!(result, AckResult::Created);
    let snapshot = tracker.get_snapshot(1, 1);
    assert_eq!(snapshot.last_read_message_id, 100);
    assert_eq!(snapshot.state, SnapshotState::Dirty);
}

#[test]
fn older_ack_is_stale_and_changes_nothing() {
    let tracker = tracker();
    tracker.ack(AckCommand::new(1, 1, 100, 0));

    let result = tracker.ack(AckCommand::new(1, 1, 50, 0));

    assert_eq!(result, AckResult::Stale);
    assert_eq!(tracker.get_snapshot(1, 1).last_read_message_id, 100);
}

#[test]
fn newer_ack_advances_and_stays_dirty() {
    let tracker = tracker();
    tracker.ack(AckCommand::new(1, 1, 100, 0));
    tracker.ack(AckCommand::new(1, 1, 50, 0));

    let result = tracker.ack(AckCommand::new(1, 1, 150, 0));

    assert_eq!(result, AckResult::Advanced);
    assert_eq!(tracker.get_snapshot(1, 1).last_read_message_id, 150);
    assert!(tracker.is_dirty(&KEY));
}

#[test]
fn drain_then_success_leaves_clean_entry() {
    let tracker = tracker();
    tracker.ack(AckCommand::new(1, 1, 100, 0));
    tracker.ack(AckCommand::new(1, 1, 150, 0));

    let batch = tracker.drain_dirty_batch(10);
    assert_eq!(batch, vec![KEY]);
    assert_eq!(tracker.entry(&KEY).unwrap().state(), EntryState::Flushing);

    tracker.on_flush_success(&batch);
    assert_eq!(tracker.entry(&KEY).unwrap().state(), EntryState::Clean);
    assert!(tracker.drain_dirty_batch(10).is_empty());
}

#[test]
fn thousand_acks_coalesce_into_one_write() {
    let tracker = tracker();
    for message_id in 1..=1000 {
        tracker.ack(AckCommand::new(1, 1, message_id, 0));
    }

    let batch = tracker.drain_dirty_batch(10);
    tracker.on_flush_success(&batch);

    let metrics = tracker.get_metrics();
    assert_eq!(metrics.total_acks, 1000);
    assert_eq!(metrics.durable_writes, 1);
    assert_eq!(metrics.coalescing_ratio, 1000.0);
}

#[test]
fn ack_during_flight_is_flushed_again() {
    let tracker = tracker();
    tracker.ack(AckCommand::new(1, 1, 100, 0));
    let batch = tracker.drain_dirty_batch(10);

    tracker.ack(AckCommand::new(1, 1, 200, 0));
    tracker.on_flush_success(&batch);

    assert!(tracker.is_dirty(&KEY));
    let rows = tracker.rows_for(&tracker.drain_dirty_batch(10));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].last_read_message_id, 200);
}
