// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ack-core: in-memory read-state tracking with write coalescing
//!
//! This crate provides:
//! - The per-(user, channel) lock-free read-state entry and its flush state machine
//! - The `AckTracker` store: acks, channel heads, dirty-set draining, flush outcomes
//! - Point-in-time snapshots and coalescing metrics
//! - Configuration, clock and message-id helpers

pub mod clock;
pub mod config;
pub mod entry;
pub mod key;
pub mod limits;
pub mod metrics;
pub mod snapshot;
pub mod snowflake;
pub mod tracker;

// Re-exports
pub use clock::{Clock, SystemClock};
pub use config::{AckConfig, ConfigError, FlusherConfig, SinkConfig, SinkKind, TrackerConfig};
pub use entry::{EntryState, ReadStateEntry};
pub use key::{AckCommand, AckKey, AckResult, ReadStateRow};
pub use limits::UsageLevel;
pub use metrics::{AckCounters, AckMetrics};
pub use snapshot::{EntrySnapshot, ReadSnapshot, SnapshotState};
pub use snowflake::{IdGen, SnowflakeIdGen};
pub use tracker::AckTracker;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
#[cfg(any(test, feature = "test-support"))]
pub use snowflake::SequentialIdGen;
