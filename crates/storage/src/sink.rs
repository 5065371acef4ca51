// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage sink backed by the row log

use crate::row_log::{LogError, RowLog};
use ack_adapters::{SinkError, StorageSink};
use ack_core::ReadStateRow;
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Sink that appends each batch to a [`RowLog`] and fsyncs it.
///
/// File I/O runs on the blocking pool; the mutex serializes appends.
#[derive(Clone)]
pub struct LogSink {
    log: Arc<Mutex<RowLog>>,
}

impl LogSink {
    pub fn open(path: &Path) -> Result<Self, LogError> {
        Ok(Self::new(RowLog::open(path)?))
    }

    pub fn new(log: RowLog) -> Self {
        Self {
            log: Arc::new(Mutex::new(log)),
        }
    }

    /// Sequence number of the last appended batch
    pub fn sequence(&self) -> u64 {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).sequence()
    }
}

#[async_trait]
impl StorageSink for LogSink {
    async fn batch_write(&self, rows: &[ReadStateRow]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }
        let log = Arc::clone(&self.log);
        let rows = rows.to_vec();

        let appended = tokio::task::spawn_blocking(move || {
            log.lock()
                .unwrap_or_else(|e| e.into_inner())
                .append(&rows)
        })
        .await
        .map_err(|e| SinkError::Unavailable(format!("log writer task failed: {}", e)))?;

        match appended {
            Ok(seq) => {
                tracing::trace!(seq, "batch appended to row log");
                Ok(())
            }
            Err(e) => Err(into_sink_error(e)),
        }
    }
}

fn into_sink_error(err: LogError) -> SinkError {
    match err {
        LogError::Io(e) => SinkError::Io(e),
        LogError::Json(e) => SinkError::Encode(e.to_string()),
        other => SinkError::Unavailable(other.to_string()),
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
