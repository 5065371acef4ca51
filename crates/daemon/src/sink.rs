// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The sink selected by configuration

use ack_adapters::{NoOpSink, SimulatedSink, SinkError, StorageSink};
use ack_core::ReadStateRow;
use ack_storage::LogSink;
use async_trait::async_trait;

/// One of the concrete sinks, chosen at startup from `sink.kind`
#[derive(Clone)]
pub enum DaemonSink {
    Log(LogSink),
    Simulated(SimulatedSink),
    Noop(NoOpSink),
}

impl DaemonSink {
    pub fn name(&self) -> &'static str {
        match self {
            DaemonSink::Log(_) => "log",
            DaemonSink::Simulated(_) => "simulated",
            DaemonSink::Noop(_) => "noop",
        }
    }
}

#[async_trait]
impl StorageSink for DaemonSink {
    async fn batch_write(&self, rows: &[ReadStateRow]) -> Result<(), SinkError> {
        match self {
            DaemonSink::Log(sink) => sink.batch_write(rows).await,
            DaemonSink::Simulated(sink) => sink.batch_write(rows).await,
            DaemonSink::Noop(sink) => sink.batch_write(rows).await,
        }
    }
}
