// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for specs

use ack_core::{AckCounters, AckTracker, FakeClock, FlusherConfig, TrackerConfig};
use std::sync::Arc;
use std::time::Duration;

/// Tracker with test limits and a manual clock
pub fn tracker() -> Arc<AckTracker<FakeClock>> {
    Arc::new(AckTracker::new(
        TrackerConfig::for_testing(),
        Arc::new(AckCounters::new()),
        FakeClock::new(),
    ))
}

/// Flusher settings that never tick on their own during a test
pub fn manual_flusher(max_batch: usize) -> FlusherConfig {
    FlusherConfig {
        flush_interval: Duration::from_secs(3600),
        max_batch,
        ..FlusherConfig::default()
    }
}

/// Poll `check` until it holds or a few seconds pass
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..500 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
