// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity and command types for read-state acknowledgements

use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite identity of one read-state entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AckKey {
    pub user_id: u64,
    pub channel_id: u64,
}

impl AckKey {
    pub const fn new(user_id: u64, channel_id: u64) -> Self {
        Self {
            user_id,
            channel_id,
        }
    }
}

impl fmt::Display for AckKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.channel_id)
    }
}

/// A client acknowledgement: "user has read channel up to message"
///
/// A negative `mention_delta` clears that many mentions when the ack
/// advances the entry; a positive one is applied when the ack creates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckCommand {
    pub user_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
    #[serde(default)]
    pub mention_delta: i32,
}

impl AckCommand {
    pub const fn new(user_id: u64, channel_id: u64, message_id: u64, mention_delta: i32) -> Self {
        Self {
            user_id,
            channel_id,
            message_id,
            mention_delta,
        }
    }

    pub const fn key(&self) -> AckKey {
        AckKey::new(self.user_id, self.channel_id)
    }
}

/// Outcome of an ack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AckResult {
    /// The entry moved forward and is pending a flush
    Advanced,
    /// The message id was not newer than the stored one; nothing changed
    Stale,
    /// First ack for this key
    Created,
}

/// Values a flush persists for one key, captured when the batch is formed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadStateRow {
    pub key: AckKey,
    pub last_read_message_id: u64,
    pub mention_count: u32,
}
