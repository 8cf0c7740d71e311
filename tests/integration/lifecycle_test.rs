//! Integration tests for multi-transaction session lifecycles and hook-set
//! filtering.

mod helpers;

use commithooks_core::types::HookSet;
use commithooks_registry::RegistryState;

use helpers::{CallLog, Recorder, point, session};

#[test]
fn test_sequential_commits_fire_each_hook_once() {
    let log = CallLog::default();
    let mut session = session();

    for i in 0..5u32 {
        let name = format!("e{i}");
        session.add(Recorder::new(i, &name, &log));
        session.commit().unwrap();

        assert_eq!(
            log.calls_for(&name),
            vec!["before_commit_from_insert", "after_commit_from_insert"]
        );
        assert_eq!(session.registry().state(), RegistryState::Idle);
        assert!(session.registry().is_empty());
        assert!(!session.in_transaction());
    }

    assert_eq!(log.count("before_commit_from_insert"), 5);
    assert_eq!(log.count("after_commit_from_insert"), 5);
    assert_eq!(log.count("failed_commit_from_insert"), 0);
    assert_eq!(session.engine().commit_count(), 5);
}

#[test]
fn test_records_do_not_leak_into_next_transaction() {
    let log = CallLog::default();
    let mut session = session();
    let first = session.add(Recorder::new(1, "first", &log));
    session.commit().unwrap();

    session.add(Recorder::new(2, "second", &log));
    session.flush().unwrap();
    assert_eq!(session.registry().len(), 1);
    assert_eq!(session.registry().records()[0].sequence().get(), 1);
    assert_ne!(session.registry().records()[0].entity(), first);

    session.commit().unwrap();
    assert_eq!(log.calls_for("first").len(), 2);
}

#[test]
fn test_unimplemented_points_are_never_called() {
    let log = CallLog::default();
    let mut session = session();
    let hooks = HookSet::of(&[point("after_commit_from_insert"), point("failed_commit_from_update")]);
    let key = session.add(Recorder::new(1, "sparse", &log).with_hooks(hooks));

    session.commit().unwrap();
    assert_eq!(log.calls(), vec!["after_commit_from_insert:sparse"]);

    session.get_mut::<Recorder>(key).unwrap().value = 3;
    session.flush().unwrap();
    session.rollback().unwrap();
    assert_eq!(
        log.calls(),
        vec!["after_commit_from_insert:sparse", "failed_commit_from_update:sparse"]
    );
}

#[test]
fn test_entity_without_hooks_is_written_but_not_recorded() {
    let log = CallLog::default();
    let mut session = session();
    session.add(Recorder::new(1, "silent", &log).with_hooks(HookSet::EMPTY));
    session.add(Recorder::new(2, "loud", &log));

    let report = session.flush().unwrap();
    assert_eq!(report.recorded, 1);
    assert_eq!(report.skipped, 1);

    let dispatch = session.commit().unwrap().unwrap();
    assert_eq!(dispatch.invoked, 1);
    assert_eq!(session.engine().row_count("recorders"), 2);
    assert!(log.calls_for("silent").is_empty());
}

#[test]
fn test_deleting_unflushed_entity_fires_nothing() {
    let log = CallLog::default();
    let mut session = session();
    let key = session.add(Recorder::new(1, "draft", &log));
    session.delete(key).unwrap();

    assert!(session.commit().unwrap().is_none());
    assert!(log.calls().is_empty());
    assert!(!session.contains(key));
}

#[test]
fn test_repeated_mutation_before_flush_records_one_update() {
    let log = CallLog::default();
    let mut session = session();
    let key = session.add(Recorder::new(1, "e", &log));
    session.commit().unwrap();
    log.clear();

    for value in 1..=3 {
        session.get_mut::<Recorder>(key).unwrap().value = value;
    }
    session.commit().unwrap();

    assert_eq!(
        log.calls(),
        vec!["before_commit_from_update:e", "after_commit_from_update:e"]
    );
    assert_eq!(session.engine().row("recorders", "1").unwrap()["value"], 3);
}
