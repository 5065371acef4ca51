// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background flusher against an in-memory sink

use crate::prelude::{eventually, manual_flusher, tracker};
use ack_adapters::{FakeSink, TracedSink};
use ack_core::{AckCommand, AckKey};
use ack_engine::DirtyQueueFlusher;
use similar_asserts::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn forced_flush_drains_backlog_across_batches() {
    let tracker = tracker();
    let sink = FakeSink::new();
    for channel in 0..25 {
        tracker.ack(AckCommand::new(7, channel, 1_000 + channel, 0));
    }

    let handle = DirtyQueueFlusher::spawn(
        Arc::clone(&tracker),
        TracedSink::new(sink.clone()),
        manual_flusher(10),
    );
    handle.force_flush();

    assert!(eventually(|| sink.stored_len() == 25).await);
    assert_eq!(tracker.dirty_len(), 0);
    assert_eq!(sink.calls().len(), 3);

    let stats = handle.shutdown().await.unwrap();
    assert_eq!(stats.keys_flushed, 25);
    assert_eq!(stats.batches, 3);
}

#[tokio::test]
async fn shutdown_drains_what_is_left() {
    let tracker = tracker();
    let sink = FakeSink::new();
    let handle = DirtyQueueFlusher::spawn(Arc::clone(&tracker), sink.clone(), manual_flusher(4));

    for user in 0..9 {
        tracker.ack(AckCommand::new(user, 3, 50, 0));
    }
    let stats = handle.shutdown().await.unwrap();

    assert_eq!(stats.keys_flushed, 9);
    assert_eq!(sink.stored_len(), 9);
    assert_eq!(tracker.dirty_len(), 0);
}

#[tokio::test]
async fn failed_batch_is_retried_on_next_pass() {
    let tracker = tracker();
    let sink = FakeSink::new();
    sink.fail_next(1);
    tracker.ack(AckCommand::new(1, 1, 10, 0));

    let handle = DirtyQueueFlusher::spawn(Arc::clone(&tracker), sink.clone(), manual_flusher(10));
    handle.force_flush();
    assert!(eventually(|| handle.stats().keys_failed == 1).await);
    assert!(tracker.is_dirty(&AckKey::new(1, 1)));

    handle.force_flush();
    assert!(eventually(|| sink.stored_len() == 1).await);

    let stats = handle.shutdown().await.unwrap();
    assert_eq!(stats.keys_failed, 1);
    assert_eq!(stats.keys_flushed, 1);
    assert_eq!(tracker.entry(&AckKey::new(1, 1)).unwrap().flush_failures(), 0);
}
