// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ack_core::{AckCommand, AckKey, ReadStateRow, SnapshotState};
use std::time::Duration;

fn log_config(dir: &Path) -> Config {
    let mut settings = AckConfig::default();
    settings.sink.kind = SinkKind::Log;
    settings.sink.log_path = Some(dir.join("rows.log"));
    settings.flusher.flush_interval = Duration::from_secs(3600);
    Config::new(settings, dir)
}

fn row(user: u64, last_read: u64) -> ReadStateRow {
    ReadStateRow {
        key: AckKey::new(user, 1),
        last_read_message_id: last_read,
        mention_count: 0,
    }
}

#[tokio::test]
async fn startup_writes_pid_and_shutdown_removes_it() {
    let dir = tempfile::tempdir().unwrap();
    let config = log_config(dir.path());

    let daemon = startup(&config).await.unwrap();
    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert_eq!(daemon.sink_name, "log");

    daemon.shutdown().await.unwrap();
    assert!(!config.lock_path.exists());
}

#[tokio::test]
async fn second_daemon_on_same_state_dir_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let config = log_config(dir.path());

    let first = startup(&config).await.unwrap();
    let second = startup(&config).await;
    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));
    // The running daemon keeps its lock file
    assert!(config.lock_path.exists());

    first.shutdown().await.unwrap();
}

#[tokio::test]
async fn invalid_settings_fail_before_locking() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = log_config(dir.path());
    config.settings.sink.log_path = None;

    let result = startup(&config).await;
    assert!(matches!(result, Err(LifecycleError::Config(_))));
    assert!(!config.lock_path.exists());
}

#[tokio::test]
async fn shutdown_flushes_pending_acks_to_row_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = log_config(dir.path());

    let daemon = startup(&config).await.unwrap();
    daemon.tracker.ack(AckCommand::new(1, 1, 100, 0));
    daemon.tracker.ack(AckCommand::new(1, 1, 150, 0));
    daemon.tracker.ack(AckCommand::new(2, 1, 90, 0));

    let stats = daemon.shutdown().await.unwrap();
    assert_eq!(stats.keys_flushed, 2);

    let rows = MaterializedRows::load(&dir.path().join("rows.log")).unwrap();
    assert_eq!(rows.get(&AckKey::new(1, 1)), Some(&row(1, 150)));
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn restart_restores_clean_entries_and_compacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = log_config(dir.path());
    let log_path = dir.path().join("rows.log");
    {
        let mut log = RowLog::open(&log_path).unwrap();
        log.append(&[row(1, 10), row(2, 20)]).unwrap();
        log.append(&[row(1, 30)]).unwrap();
    }

    let daemon = startup(&config).await.unwrap();
    assert_eq!(daemon.restored, 2);
    let snapshot = daemon.tracker.get_snapshot(1, 1);
    assert_eq!(snapshot.last_read_message_id, 30);
    assert_eq!(snapshot.state, SnapshotState::Clean);
    assert_eq!(daemon.tracker.dirty_len(), 0);

    let entries = RowLog::replay(&log_path).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].rows, vec![row(1, 30), row(2, 20)]);

    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn noop_sink_needs_no_row_log() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = AckConfig::default();
    settings.sink.kind = SinkKind::Noop;
    let config = Config::new(settings, dir.path());

    let daemon = startup(&config).await.unwrap();
    assert_eq!(daemon.sink_name, "noop");
    assert_eq!(daemon.restored, 0);
    daemon.tracker.ack(AckCommand::new(1, 1, 1, 0));

    let stats = daemon.shutdown().await.unwrap();
    assert_eq!(stats.keys_flushed, 1);
    assert!(!dir.path().join("rows.log").exists());
}
