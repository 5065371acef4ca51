// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line arguments for `ackd`

use std::path::{Path, PathBuf};
use std::time::Duration;

use ack_core::{AckConfig, SinkKind};
use clap::Parser;

use crate::lifecycle::{Config, LifecycleError};

#[derive(Debug, Parser)]
#[command(
    name = "ackd",
    version,
    about = "Read-state ack tracker with coalesced durable writes"
)]
pub struct Args {
    /// TOML settings file; built-in defaults when absent
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for the pid file and the default row log
    #[arg(long, default_value = ".ackd")]
    pub state_dir: PathBuf,

    /// JSON-lines input, `-` for stdin
    #[arg(long, default_value = "-")]
    pub feed: PathBuf,

    /// Keep reading the feed file as it grows instead of stopping at EOF
    #[arg(long)]
    pub follow: bool,

    /// Override `flusher.flush_interval` (milliseconds)
    #[arg(long)]
    pub flush_interval_ms: Option<u64>,

    /// Override `sink.kind`: log, simulated or noop
    #[arg(long, value_parser = parse_sink_kind)]
    pub sink: Option<SinkKind>,

    /// Row log location; implies `--sink log`
    #[arg(long)]
    pub row_log: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Snowflake node id (0..=1023) for stamping messages that arrive without an id
    #[arg(long, default_value = "0")]
    pub node_id: u64,

    /// Seconds between metrics reports (0 disables them)
    #[arg(long, default_value = "10")]
    pub metrics_interval_secs: u64,
}

impl Args {
    /// Settings file (or defaults) with command-line overrides applied
    pub fn to_config(&self) -> Result<Config, LifecycleError> {
        let mut settings = match &self.config {
            // Validated once, after the overrides below
            Some(path) => AckConfig::read(path)?,
            None => AckConfig::default(),
        };
        self.apply_overrides(&mut settings, &self.state_dir);
        settings.validate()?;
        Ok(Config::new(settings, &self.state_dir))
    }

    pub fn reads_stdin(&self) -> bool {
        self.feed.as_os_str() == "-"
    }

    pub fn metrics_interval(&self) -> Option<Duration> {
        (self.metrics_interval_secs > 0).then(|| Duration::from_secs(self.metrics_interval_secs))
    }

    fn apply_overrides(&self, settings: &mut AckConfig, state_dir: &Path) {
        if let Some(ms) = self.flush_interval_ms {
            settings.flusher.flush_interval = Duration::from_millis(ms);
        }
        if let Some(kind) = self.sink {
            settings.sink.kind = kind;
        }
        if let Some(path) = &self.row_log {
            settings.sink.kind = SinkKind::Log;
            settings.sink.log_path = Some(path.clone());
        }
        // A log sink without a path writes into the state directory
        if settings.sink.kind == SinkKind::Log && settings.sink.log_path.is_none() {
            settings.sink.log_path = Some(state_dir.join("rows.log"));
        }
    }
}

fn parse_sink_kind(s: &str) -> Result<SinkKind, String> {
    match s {
        "log" => Ok(SinkKind::Log),
        "simulated" => Ok(SinkKind::Simulated),
        "noop" => Ok(SinkKind::Noop),
        other => Err(format!(
            "unknown sink `{other}` (expected log, simulated or noop)"
        )),
    }
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
