// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time-sortable 64-bit message ids
//!
//! Layout: `[41-bit millis since EPOCH_MS][10-bit node][12-bit sequence]`.
//! Ids from one node are strictly increasing, and the embedded timestamp is
//! what the tracker uses to approximate unread counts.

use crate::config::ConfigError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Custom epoch (2023-11-14T22:13:20Z) in unix milliseconds
pub const EPOCH_MS: u64 = 1_700_000_000_000;

const NODE_BITS: u32 = 10;
const SEQ_BITS: u32 = 12;
const MAX_NODE: u64 = (1 << NODE_BITS) - 1;
const MAX_SEQ: u64 = (1 << SEQ_BITS) - 1;
const TIME_SHIFT: u32 = NODE_BITS + SEQ_BITS;

/// Unix millisecond timestamp embedded in a message id
pub fn timestamp_of(id: u64) -> u64 {
    (id >> TIME_SHIFT) + EPOCH_MS
}

/// Build an id from its parts (node and sequence are masked to their widths)
pub fn compose(unix_ms: u64, node: u64, seq: u64) -> u64 {
    (unix_ms.saturating_sub(EPOCH_MS) << TIME_SHIFT)
        | ((node & MAX_NODE) << SEQ_BITS)
        | (seq & MAX_SEQ)
}

/// Generates message ids
pub trait IdGen: Clone + Send + Sync {
    fn next(&self) -> u64;
}

/// Snowflake generator for one node.
///
/// Cloning yields another handle to the same sequence.
#[derive(Clone, Debug)]
pub struct SnowflakeIdGen {
    node_id: u64,
    /// Packed `(millis since epoch << SEQ_BITS) | sequence` of the last id
    state: Arc<AtomicU64>,
}

impl SnowflakeIdGen {
    pub fn new(node_id: u64) -> Result<Self, ConfigError> {
        if node_id > MAX_NODE {
            return Err(ConfigError::Invalid {
                field: "node_id",
                reason: format!("{} is outside 0..={}", node_id, MAX_NODE),
            });
        }
        Ok(Self {
            node_id,
            state: Arc::new(AtomicU64::new(now_since_epoch() << SEQ_BITS)),
        })
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }
}

impl IdGen for SnowflakeIdGen {
    fn next(&self) -> u64 {
        loop {
            let current = self.state.load(Ordering::Acquire);
            let last_ms = current >> SEQ_BITS;
            let next_ms = now_since_epoch().max(last_ms);
            let seq = if next_ms == last_ms {
                (current & MAX_SEQ) + 1
            } else {
                0
            };

            if seq > MAX_SEQ {
                // Sequence exhausted for this millisecond
                std::hint::spin_loop();
                continue;
            }

            let next = (next_ms << SEQ_BITS) | seq;
            if self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return (next_ms << TIME_SHIFT) | (self.node_id << SEQ_BITS) | seq;
            }
        }
    }
}

fn now_since_epoch() -> u64 {
    let unix_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0);
    unix_ms.saturating_sub(EPOCH_MS)
}

/// Sequential id generator for testing: 1, 2, 3, ...
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Debug)]
pub struct SequentialIdGen {
    counter: Arc<AtomicU64>,
}

#[cfg(any(test, feature = "test-support"))]
impl SequentialIdGen {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(first)),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl IdGen for SequentialIdGen {
    fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "snowflake_tests.rs"]
mod tests;
