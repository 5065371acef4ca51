// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-lines input for the daemon
//!
//! Each non-blank line is one record:
//!
//! ```text
//! {"type":"ack","user_id":1,"channel_id":7,"message_id":1234}
//! {"type":"message","channel_id":7,"message_id":1240}
//! {"type":"mention","user_id":1,"channel_id":7,"count":2}
//! ```
//!
//! A `message` without `message_id` is stamped with a freshly generated id,
//! as if the daemon had assigned it on receipt. Lines starting with `#` are
//! comments.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ack_core::{AckCommand, AckResult, AckTracker, Clock, IdGen};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Poll interval while following a file at EOF
const FOLLOW_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to open feed {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("feed read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed record: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One input record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedRecord {
    Ack {
        user_id: u64,
        channel_id: u64,
        message_id: u64,
        #[serde(default)]
        mention_delta: i32,
    },
    Message {
        channel_id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<u64>,
    },
    Mention {
        user_id: u64,
        channel_id: u64,
        #[serde(default = "one")]
        count: u32,
    },
}

fn one() -> u32 {
    1
}

impl FeedRecord {
    /// Parse one line; `None` for blank lines and comments
    pub fn parse(line: &str) -> Result<Option<Self>, FeedError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(line)?))
    }

    /// Apply to the tracker; `ids` stamps messages that arrive without an id
    pub fn apply<C: Clock, G: IdGen>(
        &self,
        tracker: &AckTracker<C>,
        ids: &G,
        stats: &mut FeedStats,
    ) {
        match *self {
            FeedRecord::Ack {
                user_id,
                channel_id,
                message_id,
                mention_delta,
            } => {
                let cmd = AckCommand::new(user_id, channel_id, message_id, mention_delta);
                match tracker.ack(cmd) {
                    AckResult::Stale => stats.stale += 1,
                    AckResult::Advanced | AckResult::Created => stats.acks += 1,
                }
            }
            FeedRecord::Message {
                channel_id,
                message_id,
            } => {
                let message_id = match message_id {
                    Some(id) => id,
                    None => {
                        stats.stamped += 1;
                        ids.next()
                    }
                };
                tracker.on_new_message(channel_id, message_id);
                stats.messages += 1;
            }
            FeedRecord::Mention {
                user_id,
                channel_id,
                count,
            } => {
                tracker.on_mention(user_id, channel_id, count);
                stats.mentions += 1;
            }
        }
    }
}

/// Counts of what the feed delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    /// Acks that created or advanced an entry
    pub acks: u64,
    pub stale: u64,
    pub messages: u64,
    /// Messages that arrived without an id and were given one
    pub stamped: u64,
    pub mentions: u64,
    /// Lines that failed to parse
    pub rejected: u64,
}

/// Parse and apply one line. Malformed lines are logged and counted, never fatal.
pub fn apply_line<C: Clock, G: IdGen>(
    line: &str,
    tracker: &AckTracker<C>,
    ids: &G,
    stats: &mut FeedStats,
) {
    match FeedRecord::parse(line) {
        Ok(Some(record)) => record.apply(tracker, ids, stats),
        Ok(None) => {}
        Err(e) => {
            stats.rejected += 1;
            tracing::warn!(error = %e, line, "rejected feed line");
        }
    }
}

/// Line reader over stdin, a file, or any async reader
pub struct FeedSource {
    reader: BufReader<Box<dyn AsyncRead + Unpin + Send>>,
    pending: Vec<u8>,
    follow: bool,
}

impl FeedSource {
    pub fn new(reader: Box<dyn AsyncRead + Unpin + Send>, follow: bool) -> Self {
        Self {
            reader: BufReader::new(reader),
            pending: Vec::new(),
            follow,
        }
    }

    pub fn stdin() -> Self {
        Self::new(Box::new(tokio::io::stdin()), false)
    }

    /// Open a file; with `follow`, EOF waits for more data instead of ending
    pub async fn open(path: &Path, follow: bool) -> Result<Self, FeedError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| FeedError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(Box::new(file), follow))
    }

    /// Next line without its terminator, or `None` at end of input.
    ///
    /// Cancel-safe: bytes move into `pending` with no await in between, so a
    /// dropped call loses nothing. While following, an unterminated tail is
    /// held until its newline arrives.
    pub async fn next_line(&mut self) -> Result<Option<String>, FeedError> {
        loop {
            if let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.pending.drain(..=pos).collect();
                return Ok(Some(decode(&line[..pos])));
            }

            let chunk = self.reader.fill_buf().await?;
            if chunk.is_empty() {
                if self.follow {
                    tokio::time::sleep(FOLLOW_POLL).await;
                    continue;
                }
                if self.pending.is_empty() {
                    return Ok(None);
                }
                let rest = std::mem::take(&mut self.pending);
                return Ok(Some(decode(&rest)));
            }
            let n = chunk.len();
            self.pending.extend_from_slice(chunk);
            self.reader.consume(n);
        }
    }
}

fn decode(bytes: &[u8]) -> String {
    let line = String::from_utf8_lossy(bytes);
    line.strip_suffix('\r').unwrap_or(&line).to_string()
}

#[cfg(test)]
#[path = "feed_tests.rs"]
mod tests;
