// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Flush engine: moves dirty read state into a storage sink

mod error;
mod flush;
mod flusher;

pub use error::FlusherError;
pub use flush::{flush_pending, FlushReport};
pub use flusher::{DirtyQueueFlusher, FlushStats, FlusherHandle};
