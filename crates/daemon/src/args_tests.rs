// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

fn parse(argv: &[&str]) -> Args {
    Args::try_parse_from(std::iter::once("ackd").chain(argv.iter().copied())).unwrap()
}

#[test]
fn defaults_read_stdin_with_simulated_sink() {
    let args = parse(&[]);
    assert!(args.reads_stdin());
    assert!(!args.follow);
    assert_eq!(args.node_id, 0);
    assert_eq!(args.metrics_interval(), Some(Duration::from_secs(10)));

    let config = args.to_config().unwrap();
    assert_eq!(config.settings.sink.kind, SinkKind::Simulated);
    assert_eq!(config.lock_path, PathBuf::from(".ackd/ackd.pid"));
}

#[test]
fn overrides_replace_settings() {
    let args = parse(&["--sink", "noop", "--flush-interval-ms", "250", "--metrics-interval-secs", "0"]);
    let config = args.to_config().unwrap();
    assert_eq!(config.settings.sink.kind, SinkKind::Noop);
    assert_eq!(
        config.settings.flusher.flush_interval,
        Duration::from_millis(250)
    );
    assert_eq!(args.metrics_interval(), None);
}

#[test]
fn row_log_implies_log_sink() {
    let args = parse(&["--sink", "noop", "--row-log", "/tmp/acks/rows.log"]);
    let config = args.to_config().unwrap();
    assert_eq!(config.settings.sink.kind, SinkKind::Log);
    assert_eq!(
        config.settings.sink.log_path,
        Some(PathBuf::from("/tmp/acks/rows.log"))
    );
}

#[test]
fn log_sink_defaults_into_state_dir() {
    let args = parse(&["--sink", "log", "--state-dir", "/var/lib/ackd"]);
    let config = args.to_config().unwrap();
    assert_eq!(
        config.settings.sink.log_path,
        Some(PathBuf::from("/var/lib/ackd/rows.log"))
    );
}

#[test]
fn unknown_sink_is_rejected() {
    let result = Args::try_parse_from(["ackd", "--sink", "cassandra"]);
    assert!(result.is_err());
}

#[test]
fn settings_file_is_loaded_then_overridden() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[flusher]\nflush_interval = \"2s\"\nmax_batch = 50\n\n[sink]\nkind = \"noop\""
    )
    .unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let config = parse(&["--config", &path]).to_config().unwrap();
    assert_eq!(config.settings.flusher.max_batch, 50);
    assert_eq!(config.settings.flusher.flush_interval, Duration::from_secs(2));

    let config = parse(&["--config", &path, "--flush-interval-ms", "100"])
        .to_config()
        .unwrap();
    assert_eq!(
        config.settings.flusher.flush_interval,
        Duration::from_millis(100)
    );
}

#[test]
fn settings_file_log_sink_defaults_into_state_dir() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[sink]\nkind = \"log\"").unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let config = parse(&["--config", &path, "--state-dir", "/var/lib/ackd"])
        .to_config()
        .unwrap();
    assert_eq!(config.settings.sink.kind, SinkKind::Log);
    assert_eq!(
        config.settings.sink.log_path,
        Some(PathBuf::from("/var/lib/ackd/rows.log"))
    );
}

#[test]
fn invalid_settings_file_fails_after_overrides() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[flusher]\nmax_batch = 0").unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let result = parse(&["--config", &path]).to_config();
    assert!(matches!(result, Err(LifecycleError::Config(_))));
}

#[test]
fn invalid_override_fails_validation() {
    let args = parse(&["--flush-interval-ms", "0"]);
    assert!(matches!(args.to_config(), Err(LifecycleError::Config(_))));
}
