// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the flusher

use thiserror::Error;

/// Errors from stopping the background flusher
#[derive(Debug, Error)]
pub enum FlusherError {
    #[error("flusher task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
