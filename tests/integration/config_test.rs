//! Integration tests for configuration loading and its effect on sessions.

mod helpers;

use commithooks_core::config::AppConfig;
use commithooks_core::config::logging::LogFormat;
use commithooks_core::{AppError, ErrorKind};
use commithooks_session::{EntityState, HookSession, MemoryEngine};

use helpers::{CallLog, Recorder};

#[test]
fn test_load_default_config_directory() {
    let config = AppConfig::load("integration-test").expect("default config should load");
    assert!(config.hooks.flush_on_commit);
    assert!(config.hooks.replay_failed_after_flush_error);
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn test_file_config_drives_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("manual-flush.toml");
    std::fs::write(&path, "[hooks]\nflush_on_commit = false\n").expect("write");

    let config = AppConfig::from_file(&path).expect("should load");
    let mut session = HookSession::with_config(MemoryEngine::new(), config.hooks);

    let log = CallLog::default();
    let key = session.add(Recorder::new(1, "e", &log));
    assert!(session.commit().unwrap().is_none());
    assert_eq!(session.state(key), Some(EntityState::Pending));
    assert!(log.calls().is_empty());

    session.flush().unwrap();
    session.commit().unwrap();
    assert_eq!(log.calls_for("e").len(), 2);
}

#[test]
fn test_invalid_config_value_is_configuration_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[logging]\nformat = \"xml\"\n").expect("write");

    let err = AppConfig::from_file(&path).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[test]
fn test_error_display_includes_kind() {
    let err = AppError::ordering("no flush recorded");
    assert_eq!(err.to_string(), "ORDERING: no flush recorded");
    assert!(err.is(ErrorKind::Ordering));
}
