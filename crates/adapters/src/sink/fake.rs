// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake storage sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{SinkError, StorageSink};
use ack_core::{AckKey, ReadStateRow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Recorded batch write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkCall {
    pub rows: Vec<ReadStateRow>,
    pub succeeded: bool,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<SinkCall>,
    /// Latest persisted row per key
    stored: HashMap<AckKey, ReadStateRow>,
    fail_next: usize,
    fail_always: bool,
}

/// Fake sink that records batches and fails on demand
#[derive(Clone, Default)]
pub struct FakeSink {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` batch writes
    pub fn fail_next(&self, count: usize) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).fail_next = count;
    }

    /// Fail every batch write until turned off
    pub fn set_fail_always(&self, fail: bool) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).fail_always = fail;
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<SinkCall> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Rows from successful writes, in write order
    pub fn written_rows(&self) -> Vec<ReadStateRow> {
        self.calls()
            .into_iter()
            .filter(|call| call.succeeded)
            .flat_map(|call| call.rows)
            .collect()
    }

    /// Latest persisted row for a key
    pub fn stored(&self, key: &AckKey) -> Option<ReadStateRow> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .stored
            .get(key)
            .copied()
    }

    pub fn stored_len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .stored
            .len()
    }
}

#[async_trait]
impl StorageSink for FakeSink {
    async fn batch_write(&self, rows: &[ReadStateRow]) -> Result<(), SinkError> {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        let fail = state.fail_always || state.fail_next > 0;
        if state.fail_next > 0 {
            state.fail_next -= 1;
        }
        state.calls.push(SinkCall {
            rows: rows.to_vec(),
            succeeded: !fail,
        });

        if fail {
            return Err(SinkError::Unavailable("scripted failure".to_string()));
        }
        for row in rows {
            state.stored.insert(row.key, *row);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
