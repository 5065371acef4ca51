// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable storage sinks

mod noop;
mod simulated;

pub use noop::NoOpSink;
pub use simulated::SimulatedSink;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSink, SinkCall};

use ack_core::ReadStateRow;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from batch writes
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("write timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode row: {0}")]
    Encode(String),
}

/// Destination for flushed read-state rows.
///
/// A batch succeeds or fails as a whole from the tracker's point of view;
/// on failure every key in it is retried.
#[async_trait]
pub trait StorageSink: Clone + Send + Sync + 'static {
    /// Persist the latest values for a batch of keys
    async fn batch_write(&self, rows: &[ReadStateRow]) -> Result<(), SinkError>;
}
