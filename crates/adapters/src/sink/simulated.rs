// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process model of a wide-column store's batch write path
//!
//! Every batch sleeps for a random latency drawn from
//! `latency_min..=latency_max`, then fails with probability `failure_rate`.
//! With timeout injection on, batches stall for `timeout_latency` plus up
//! to half of it again and then fail, which exercises the retry path.

use super::{SinkError, StorageSink};
use ack_core::{ReadStateRow, SinkConfig};
use async_trait::async_trait;
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct SimulatedSink {
    failure_rate: f64,
    latency_min: Duration,
    latency_max: Duration,
    timeout_latency: Duration,
    inject_timeout: Arc<AtomicBool>,
    rows_written: Arc<AtomicU64>,
}

enum Outcome {
    Ok,
    RandomTimeout,
    InjectedTimeout,
}

impl SimulatedSink {
    pub fn new(config: &SinkConfig) -> Self {
        Self {
            failure_rate: config.failure_rate,
            latency_min: config.latency_min,
            latency_max: config.latency_max.max(config.latency_min),
            timeout_latency: config.timeout_latency,
            inject_timeout: Arc::new(AtomicBool::new(false)),
            rows_written: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Toggle timeout injection; clones share the switch
    pub fn set_inject_timeout(&self, inject: bool) {
        self.inject_timeout.store(inject, Ordering::Relaxed);
    }

    pub fn is_injecting_timeout(&self) -> bool {
        self.inject_timeout.load(Ordering::Relaxed)
    }

    /// Rows acknowledged by successful batches
    pub fn rows_written(&self) -> u64 {
        self.rows_written.load(Ordering::Relaxed)
    }

    /// Pick latency and outcome up front; the thread-local rng must not
    /// live across the sleep
    fn roll(&self) -> (Duration, Outcome) {
        let mut rng = rand::thread_rng();
        if self.is_injecting_timeout() {
            let jitter = rng.gen_range(Duration::ZERO..=self.timeout_latency / 2);
            return (self.timeout_latency + jitter, Outcome::InjectedTimeout);
        }
        let latency = rng.gen_range(self.latency_min..=self.latency_max);
        if rng.gen_bool(self.failure_rate.clamp(0.0, 1.0)) {
            (latency, Outcome::RandomTimeout)
        } else {
            (latency, Outcome::Ok)
        }
    }
}

impl Default for SimulatedSink {
    fn default() -> Self {
        Self::new(&SinkConfig::default())
    }
}

#[async_trait]
impl StorageSink for SimulatedSink {
    async fn batch_write(&self, rows: &[ReadStateRow]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }

        let (latency, outcome) = self.roll();
        tokio::time::sleep(latency).await;

        match outcome {
            Outcome::Ok => {
                self.rows_written
                    .fetch_add(rows.len() as u64, Ordering::Relaxed);
                for row in rows {
                    tracing::trace!(
                        key = %row.key,
                        last_read = row.last_read_message_id,
                        mentions = row.mention_count,
                        "row written"
                    );
                }
                Ok(())
            }
            Outcome::RandomTimeout => {
                tracing::warn!(rows = rows.len(), "simulated write timeout");
                Err(SinkError::Timeout(latency))
            }
            Outcome::InjectedTimeout => Err(SinkError::Timeout(latency)),
        }
    }
}
