//! Integration tests for failed commits, flush errors, and callback errors.

mod helpers;

use commithooks_core::ErrorKind;
use commithooks_core::config::hooks::HookConfig;
use commithooks_registry::{Outcome, RegistryState};
use commithooks_session::{HookSession, MemoryEngine};

use helpers::{CallLog, Recorder, point, session};

#[test]
fn test_sequential_failed_commits_fire_each_hook_once() {
    let log = CallLog::default();
    let mut session = session();

    for i in 0..3u32 {
        let name = format!("e{i}");
        let key = session.add(Recorder::new(i, &name, &log));
        session.engine_mut().fail_next_commit("unavailable");

        let err = session.commit().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Commit);
        assert_eq!(
            log.calls_for(&name),
            vec!["before_commit_from_insert", "failed_commit_from_insert"]
        );
        assert!(!session.contains(key));
    }

    assert_eq!(log.count("after_commit_from_insert"), 0);
    assert_eq!(session.engine().row_count("recorders"), 0);
    assert_eq!(session.engine().commit_count(), 0);
}

#[test]
fn test_duplicate_primary_key_flush_then_rollback() {
    let log = CallLog::default();
    let mut session = session();
    session.add(Recorder::new(9, "a", &log));
    session.add(Recorder::new(9, "b", &log));

    let err = session.flush().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Flush);
    assert_eq!(log.count("before_commit_from_insert"), 2);
    assert!(session.is_poisoned());

    let report = session.rollback().unwrap().unwrap();
    assert_eq!(report.outcome, Outcome::Failed);
    assert_eq!(
        log.calls(),
        vec![
            "before_commit_from_insert:a",
            "before_commit_from_insert:b",
            "failed_commit_from_insert:a",
            "failed_commit_from_insert:b",
        ]
    );
    assert_eq!(session.engine().row_count("recorders"), 0);
    assert!(!session.is_poisoned());

    session.add(Recorder::new(10, "c", &log));
    session.commit().unwrap();
    assert_eq!(log.calls_for("c").len(), 2);
}

#[test]
fn test_before_hook_error_aborts_commit_and_replays_failed() {
    let log = CallLog::default();
    let mut session = session();
    session.add(Recorder::new(1, "ok", &log));
    session.add(Recorder::new(2, "bad", &log).failing_on(point("before_commit_from_insert")));
    session.add(Recorder::new(3, "never", &log));

    let err = session.commit().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Callback);
    assert_eq!(
        log.calls(),
        vec![
            "before_commit_from_insert:ok",
            "before_commit_from_insert:bad",
            "failed_commit_from_insert:ok",
            "failed_commit_from_insert:bad",
        ]
    );
    assert!(log.calls_for("never").is_empty());
    assert_eq!(session.engine().row_count("recorders"), 0);
    assert!(!session.in_transaction());
}

#[test]
fn test_before_hook_error_without_failed_replay() {
    let log = CallLog::default();
    let config = HookConfig {
        replay_failed_after_flush_error: false,
        ..HookConfig::default()
    };
    let mut session = HookSession::with_config(MemoryEngine::new(), config);
    session.add(Recorder::new(1, "bad", &log).failing_on(point("before_commit_from_insert")));

    assert!(session.commit().is_err());
    assert_eq!(log.calls(), vec!["before_commit_from_insert:bad"]);
    assert_eq!(session.registry().state(), RegistryState::Idle);
}

#[test]
fn test_after_hook_error_halts_replay_but_keeps_commit() {
    let log = CallLog::default();
    let mut session = session();
    session.add(Recorder::new(1, "first", &log).failing_on(point("after_commit_from_insert")));
    session.add(Recorder::new(2, "second", &log));

    let err = session.commit().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Callback);
    assert_eq!(
        log.calls(),
        vec![
            "before_commit_from_insert:first",
            "before_commit_from_insert:second",
            "after_commit_from_insert:first",
        ]
    );
    assert_eq!(log.count("failed_commit_from_insert"), 0);
    assert_eq!(session.engine().row_count("recorders"), 2);
    assert_eq!(session.registry().state(), RegistryState::Idle);
}

#[test]
fn test_failed_hook_error_replaces_commit_error() {
    let log = CallLog::default();
    let mut session = session();
    session.add(Recorder::new(1, "e", &log).failing_on(point("failed_commit_from_insert")));
    session.engine_mut().fail_next_commit("lost connection");

    let err = session.commit().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Callback);
    assert_eq!(
        log.calls(),
        vec!["before_commit_from_insert:e", "failed_commit_from_insert:e"]
    );
    assert!(!session.in_transaction());
}

#[test]
fn test_explicit_rollback_after_flush_dispatches_failed() {
    let log = CallLog::default();
    let mut session = session();
    let key = session.add(Recorder::new(1, "e", &log));
    session.commit().unwrap();
    log.clear();

    session.delete(key).unwrap();
    session.flush().unwrap();
    session.rollback().unwrap();

    assert_eq!(
        log.calls(),
        vec!["before_commit_from_delete:e", "failed_commit_from_delete:e"]
    );
    assert!(session.contains(key));
    assert!(session.engine().row("recorders", "1").is_some());
}

#[test]
fn test_failed_hook_error_replaces_flush_error_on_commit() {
    let log = CallLog::default();
    let mut session = session();
    session.add(Recorder::new(9, "a", &log).failing_on(point("failed_commit_from_insert")));
    session.add(Recorder::new(9, "b", &log));

    let err = session.commit().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Callback);
    assert_eq!(
        log.calls(),
        vec![
            "before_commit_from_insert:a",
            "before_commit_from_insert:b",
            "failed_commit_from_insert:a",
        ]
    );
    assert!(!session.in_transaction());
    assert!(!session.is_poisoned());
}

#[test]
fn test_failed_hook_error_surfaces_from_commit_of_inactive_transaction() {
    let log = CallLog::default();
    let mut session = session();
    session.add(Recorder::new(9, "a", &log).failing_on(point("failed_commit_from_insert")));
    session.add(Recorder::new(9, "b", &log));
    assert_eq!(session.flush().unwrap_err().kind, ErrorKind::Flush);

    let err = session.commit().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Callback);
    assert_eq!(log.count("failed_commit_from_insert"), 1);
    assert!(!session.in_transaction());
}

#[test]
fn test_write_error_replays_failed_when_replay_disabled() {
    let log = CallLog::default();
    let config = HookConfig {
        replay_failed_after_flush_error: false,
        ..HookConfig::default()
    };
    let mut session = HookSession::with_config(MemoryEngine::new(), config);
    session.add(Recorder::new(9, "a", &log));
    session.add(Recorder::new(9, "b", &log));

    let err = session.commit().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Flush);
    assert_eq!(
        log.calls(),
        vec![
            "before_commit_from_insert:a",
            "before_commit_from_insert:b",
            "failed_commit_from_insert:a",
            "failed_commit_from_insert:b",
        ]
    );
}
