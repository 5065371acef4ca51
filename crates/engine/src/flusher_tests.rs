// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ack_adapters::FakeSink;
use ack_core::{AckCommand, AckCounters, AckKey, FakeClock, TrackerConfig};
use std::time::Duration;

fn tracker() -> Arc<AckTracker<FakeClock>> {
    Arc::new(AckTracker::new(
        TrackerConfig::for_testing(),
        Arc::new(AckCounters::new()),
        FakeClock::new(),
    ))
}

fn config(interval: Duration) -> FlusherConfig {
    FlusherConfig::default()
        .with_flush_interval(interval)
        .with_max_batch(10)
}

/// Poll `cond` until it holds or a second passes
async fn wait_for(cond: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

const HOUR: Duration = Duration::from_secs(3600);

#[tokio::test]
async fn scheduled_tick_flushes_dirty_keys() {
    let tracker = tracker();
    let sink = FakeSink::new();
    tracker.ack(AckCommand::new(1, 1, 100, 0));

    let handle =
        DirtyQueueFlusher::spawn(Arc::clone(&tracker), sink.clone(), config(Duration::from_millis(20)));

    assert!(wait_for(|| sink.stored_len() == 1).await);
    assert_eq!(tracker.dirty_len(), 0);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn force_flush_wakes_before_the_interval() {
    let tracker = tracker();
    let sink = FakeSink::new();
    let handle = DirtyQueueFlusher::spawn(Arc::clone(&tracker), sink.clone(), config(HOUR));

    tracker.ack(AckCommand::new(1, 1, 100, 0));
    handle.force_flush();

    assert!(wait_for(|| sink.stored_len() == 1).await);
    assert_eq!(handle.stats().keys_flushed, 1);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_performs_final_drain() {
    let tracker = tracker();
    let sink = FakeSink::new();
    let handle = DirtyQueueFlusher::spawn(Arc::clone(&tracker), sink.clone(), config(HOUR));

    for channel in 0..25 {
        tracker.ack(AckCommand::new(1, channel, 100, 0));
    }

    let stats = handle.shutdown().await.unwrap();

    assert_eq!(stats.keys_flushed, 25);
    assert_eq!(stats.batches, 3);
    assert_eq!(sink.stored_len(), 25);
    assert_eq!(tracker.dirty_len(), 0);
}

#[tokio::test]
async fn final_drain_covers_more_than_one_pass() {
    let tracker = tracker();
    let sink = FakeSink::new();
    let config = FlusherConfig {
        max_batches_per_pass: 2,
        ..config(HOUR)
    };
    let handle = DirtyQueueFlusher::spawn(Arc::clone(&tracker), sink.clone(), config);

    for channel in 0..55 {
        tracker.ack(AckCommand::new(1, channel, 100, 0));
    }

    let stats = handle.shutdown().await.unwrap();
    assert_eq!(stats.keys_flushed, 55);
    assert_eq!(tracker.dirty_len(), 0);
}

#[tokio::test]
async fn failed_batches_retry_on_next_wake() {
    let tracker = tracker();
    let sink = FakeSink::new();
    sink.fail_next(1);
    let handle = DirtyQueueFlusher::spawn(Arc::clone(&tracker), sink.clone(), config(HOUR));

    tracker.ack(AckCommand::new(1, 1, 100, 0));
    handle.force_flush();
    assert!(wait_for(|| handle.stats().keys_failed == 1).await);
    assert!(tracker.is_dirty(&AckKey::new(1, 1)));

    handle.force_flush();
    assert!(wait_for(|| sink.stored_len() == 1).await);

    let stats = handle.shutdown().await.unwrap();
    assert_eq!(stats.keys_failed, 1);
    assert_eq!(stats.keys_flushed, 1);
}

#[tokio::test]
async fn dropping_the_handle_stops_the_loop() {
    let tracker = tracker();
    let sink = FakeSink::new();
    let handle = DirtyQueueFlusher::spawn(Arc::clone(&tracker), sink.clone(), config(HOUR));

    tracker.ack(AckCommand::new(1, 1, 100, 0));
    drop(handle);

    // The loop exits through its final drain
    assert!(wait_for(|| sink.stored_len() == 1).await);
}
