// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only row log for durable storage
//!
//! One JSON line per flushed batch. Each append is fsynced before it
//! returns, so a batch reported as written survives a crash. A crash in
//! the middle of an append can leave a partial last line; `open` trims it
//! and `replay` skips it.

use ack_core::ReadStateRow;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in row log operations
#[derive(Debug, Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt row log entry at line {line}: {source}")]
    Corrupt {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// One flushed batch as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub seq: u64,
    pub rows: Vec<ReadStateRow>,
}

/// Append-only log of flushed batches
#[derive(Debug)]
pub struct RowLog {
    file: File,
    path: PathBuf,
    sequence: u64,
}

impl RowLog {
    /// Open or create a row log at the given path
    pub fn open(path: &Path) -> Result<Self, LogError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;
        trim_partial_tail(&file, path)?;

        let sequence = Self::replay(path)?.last().map(|e| e.seq).unwrap_or(0);

        Ok(Self {
            file,
            path: path.to_path_buf(),
            sequence,
        })
    }

    /// Append a batch of rows, returning its sequence number
    pub fn append(&mut self, rows: &[ReadStateRow]) -> Result<u64, LogError> {
        if rows.is_empty() {
            return Ok(self.sequence);
        }
        let entry = LogEntry {
            seq: self.sequence + 1,
            rows: rows.to_vec(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.sync_all()?;
        self.sequence = entry.seq;
        Ok(self.sequence)
    }

    /// Get the current sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the log with a single entry holding `rows`.
    ///
    /// Written to a sibling temp file and renamed into place, so a crash
    /// leaves either the old log or the new one.
    pub fn compact(&mut self, rows: Vec<ReadStateRow>) -> Result<u64, LogError> {
        let tmp_path = self.path.with_extension("compact");
        let entry = LogEntry {
            seq: self.sequence + 1,
            rows,
        };
        {
            let mut tmp = File::create(&tmp_path)?;
            if !entry.rows.is_empty() {
                let mut line = serde_json::to_string(&entry)?;
                line.push('\n');
                tmp.write_all(line.as_bytes())?;
            }
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;

        self.file = OpenOptions::new()
            .append(true)
            .read(true)
            .open(&self.path)?;
        self.sequence = entry.seq;
        Ok(self.sequence)
    }

    /// Replay all entries from the log
    pub fn replay(path: &Path) -> Result<Vec<LogEntry>, LogError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<String> = BufReader::new(file).lines().collect::<Result<_, _>>()?;
        let last = lines.len();
        let mut entries = Vec::with_capacity(last);

        for (index, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(line) {
                Ok(entry) => entries.push(entry),
                // A torn final write is expected after a crash
                Err(e) if index + 1 == last => {
                    tracing::warn!(line = index + 1, error = %e, "skipping partial row log entry");
                }
                Err(source) => {
                    return Err(LogError::Corrupt {
                        line: index + 1,
                        source,
                    })
                }
            }
        }

        Ok(entries)
    }
}

/// Cut a trailing line that lacks its newline so the next append starts clean
fn trim_partial_tail(file: &File, path: &Path) -> Result<(), LogError> {
    let contents = std::fs::read(path)?;
    if contents.is_empty() || contents.ends_with(b"\n") {
        return Ok(());
    }
    let keep = contents
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|pos| pos + 1)
        .unwrap_or(0);
    tracing::warn!(
        path = %path.display(),
        dropped_bytes = contents.len() - keep,
        "trimming partial row log tail"
    );
    file.set_len(keep as u64)?;
    Ok(())
}

#[cfg(test)]
#[path = "row_log_tests.rs"]
mod tests;
