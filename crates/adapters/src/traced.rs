// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced sink wrapper for consistent observability

use crate::sink::{SinkError, StorageSink};
use ack_core::ReadStateRow;
use async_trait::async_trait;
use tracing::Instrument;

/// Wrapper that adds tracing to any StorageSink
#[derive(Clone)]
pub struct TracedSink<S> {
    inner: S,
}

impl<S> TracedSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: StorageSink> StorageSink for TracedSink<S> {
    async fn batch_write(&self, rows: &[ReadStateRow]) -> Result<(), SinkError> {
        // Empty batches never reach the store
        if rows.is_empty() {
            tracing::trace!("empty batch skipped");
            return Ok(());
        }

        let span = tracing::info_span!(
            "sink.batch_write",
            rows = rows.len(),
            first_key = %rows[0].key
        );

        async {
            tracing::debug!("writing");

            let start = std::time::Instant::now();
            let result = self.inner.batch_write(rows).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::debug!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    "batch written"
                ),
                Err(e) => tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "batch write failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
