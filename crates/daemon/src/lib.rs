// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ackd: hosts one tracker and flusher, fed from a JSON-lines stream

pub mod args;
pub mod feed;
pub mod lifecycle;
mod sink;

pub use args::Args;
pub use feed::{FeedError, FeedRecord, FeedSource, FeedStats};
pub use lifecycle::{startup, Config, DaemonState, LifecycleError};
pub use sink::DaemonSink;
