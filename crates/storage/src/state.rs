// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized rows from row log replay

use crate::row_log::{LogEntry, LogError, RowLog};
use ack_core::{AckKey, ReadStateRow};
use std::collections::HashMap;
use std::path::Path;

/// Latest durable row per key, built from row log entries
#[derive(Debug, Default)]
pub struct MaterializedRows {
    rows: HashMap<AckKey, ReadStateRow>,
}

impl MaterializedRows {
    /// Replay the log at `path` (a missing log yields no rows)
    pub fn load(path: &Path) -> Result<Self, LogError> {
        let mut state = Self::default();
        for entry in RowLog::replay(path)? {
            state.apply(&entry);
        }
        Ok(state)
    }

    /// Apply a flushed batch to update the state
    pub fn apply(&mut self, entry: &LogEntry) {
        for row in &entry.rows {
            self.apply_row(*row);
        }
    }

    /// Keep `row` unless a stored row has read further.
    ///
    /// On an equal read pointer the later row wins, since mention counts
    /// can change without the pointer moving.
    pub fn apply_row(&mut self, row: ReadStateRow) {
        self.rows
            .entry(row.key)
            .and_modify(|stored| {
                if row.last_read_message_id >= stored.last_read_message_id {
                    *stored = row;
                }
            })
            .or_insert(row);
    }

    pub fn get(&self, key: &AckKey) -> Option<&ReadStateRow> {
        self.rows.get(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &ReadStateRow> {
        self.rows.values()
    }

    /// All rows ordered by key
    pub fn sorted_rows(&self) -> Vec<ReadStateRow> {
        let mut rows: Vec<ReadStateRow> = self.rows.values().copied().collect();
        rows.sort_by_key(|row| row.key);
        rows
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
