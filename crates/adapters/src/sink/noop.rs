// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op sink for when durable writes are disabled.

use super::{SinkError, StorageSink};
use ack_core::ReadStateRow;
use async_trait::async_trait;

/// Sink that accepts and discards every batch.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpSink;

impl NoOpSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StorageSink for NoOpSink {
    async fn batch_write(&self, _rows: &[ReadStateRow]) -> Result<(), SinkError> {
        Ok(())
    }
}
