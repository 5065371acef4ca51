// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration for the tracker, the flusher and the storage sink
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! [tracker]
//! max_entries = 200000
//! max_flush_attempts = 10
//!
//! [flusher]
//! flush_interval = "5s"
//! max_batch = 500
//!
//! [sink]
//! kind = "simulated"
//! failure_rate = 0.01
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AckConfig {
    pub tracker: TrackerConfig,
    pub flusher: FlusherConfig,
    pub sink: SinkConfig,
}

impl AckConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without validating, for callers that layer
    /// overrides on top and validate the result themselves
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AckConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tracker.max_entries == 0 {
            return Err(invalid("tracker.max_entries", "must be greater than zero"));
        }
        if self.tracker.unread_ms_per_message == 0 {
            return Err(invalid(
                "tracker.unread_ms_per_message",
                "must be greater than zero",
            ));
        }
        if self.flusher.max_batch == 0 {
            return Err(invalid("flusher.max_batch", "must be greater than zero"));
        }
        if self.flusher.max_batches_per_pass == 0 {
            return Err(invalid(
                "flusher.max_batches_per_pass",
                "must be greater than zero",
            ));
        }
        if self.flusher.flush_interval.is_zero() {
            return Err(invalid("flusher.flush_interval", "must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.sink.failure_rate) {
            return Err(invalid("sink.failure_rate", "must be within 0.0..=1.0"));
        }
        if self.sink.latency_min > self.sink.latency_max {
            return Err(invalid("sink.latency_min", "must not exceed sink.latency_max"));
        }
        if self.sink.kind == SinkKind::Log && self.sink.log_path.is_none() {
            return Err(invalid("sink.log_path", "required when sink.kind = \"log\""));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

/// Settings for the in-memory store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Advisory bound on entries; exceeding it only warns (no eviction)
    pub max_entries: usize,
    /// Consecutive failed flushes before a key is dead-lettered (0 = retry forever)
    pub max_flush_attempts: u32,
    /// Assumed gap between messages when approximating unread counts
    pub unread_ms_per_message: u64,
    /// Upper bound reported for approximate unread counts
    pub unread_cap: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_entries: 200_000,
            max_flush_attempts: 10,
            unread_ms_per_message: 1_000,
            unread_cap: 99,
        }
    }
}

impl TrackerConfig {
    /// Settings suitable for testing (small limits)
    pub fn for_testing() -> Self {
        Self {
            max_entries: 1_000,
            max_flush_attempts: 3,
            ..Self::default()
        }
    }
}

/// Settings for the background flusher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlusherConfig {
    /// Scheduled wake interval
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,
    /// Keys per batch write
    pub max_batch: usize,
    /// Upper bound on batch writes in one pass
    pub max_batches_per_pass: usize,
}

impl Default for FlusherConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(5),
            max_batch: 500,
            max_batches_per_pass: 1_000,
        }
    }
}

impl FlusherConfig {
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch;
        self
    }
}

/// Which storage sink the daemon writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Append-only row log on local disk
    Log,
    /// In-process Cassandra-like latency and failure model
    #[default]
    Simulated,
    /// Discard every batch
    Noop,
}

/// Settings for the storage sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SinkConfig {
    pub kind: SinkKind,
    /// Row log location (log sink only)
    pub log_path: Option<PathBuf>,
    /// Probability that a simulated batch times out
    pub failure_rate: f64,
    #[serde(with = "humantime_serde")]
    pub latency_min: Duration,
    #[serde(with = "humantime_serde")]
    pub latency_max: Duration,
    /// Latency of an injected timeout before the batch fails
    #[serde(with = "humantime_serde")]
    pub timeout_latency: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            log_path: None,
            failure_rate: 0.01,
            latency_min: Duration::from_millis(6),
            latency_max: Duration::from_millis(26),
            timeout_latency: Duration::from_millis(800),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
