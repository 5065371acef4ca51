// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row log as the durable store: flush, replay, restore

use crate::prelude::{manual_flusher, tracker};
use ack_core::{AckCommand, AckKey, SnapshotState};
use ack_engine::flush_pending;
use ack_storage::{LogSink, MaterializedRows};
use similar_asserts::assert_eq;

#[tokio::test]
async fn flushed_rows_restore_into_a_fresh_tracker() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rows.log");

    let first = tracker();
    let sink = LogSink::open(&path).unwrap();
    first.ack(AckCommand::new(1, 1, 100, 0));
    first.on_mention(2, 1, 3);
    flush_pending(&first, &sink, &manual_flusher(10)).await;

    first.ack(AckCommand::new(1, 1, 180, 0));
    flush_pending(&first, &sink, &manual_flusher(10)).await;
    assert_eq!(sink.sequence(), 2);

    let rows = MaterializedRows::load(&path).unwrap();
    assert_eq!(rows.len(), 2);

    let second = tracker();
    assert_eq!(second.restore(rows.rows()), 2);

    let snapshot = second.get_snapshot(1, 1);
    assert_eq!(snapshot.last_read_message_id, 180);
    assert_eq!(snapshot.state, SnapshotState::Clean);
    assert_eq!(second.get_snapshot(2, 1).mention_count, 3);
    assert_eq!(second.dirty_len(), 0);
}

#[tokio::test]
async fn restore_never_lowers_a_newer_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rows.log");
    let writer = tracker();
    let sink = LogSink::open(&path).unwrap();
    writer.ack(AckCommand::new(1, 1, 100, 0));
    flush_pending(&writer, &sink, &manual_flusher(10)).await;

    let live = tracker();
    live.ack(AckCommand::new(1, 1, 500, 0));
    let rows = MaterializedRows::load(&path).unwrap();
    assert_eq!(live.restore(rows.rows()), 0);

    assert_eq!(live.get_snapshot(1, 1).last_read_message_id, 500);
    assert!(live.is_dirty(&AckKey::new(1, 1)));
}
