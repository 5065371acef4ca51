// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! File-backed durable store for read-state rows
//!
//! Flushed batches are appended to a JSON-lines row log. On startup the
//! log is replayed into [`MaterializedRows`], the latest row per key, and
//! the tracker is seeded from it.

mod row_log;
mod sink;
mod state;

pub use row_log::{LogEntry, LogError, RowLog};
pub use sink::LogSink;
pub use state::MaterializedRows;
