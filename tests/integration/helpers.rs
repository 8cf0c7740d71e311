//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use commithooks_core::error::AppError;
use commithooks_core::result::AppResult;
use commithooks_core::traits::{CommitHooks, Model};
use commithooks_core::types::{HookPhase, HookPoint, HookSet, OperationKind};
use commithooks_session::{HookSession, MemoryEngine};

/// Calls recorded across all entities of a test, as `"<hook>:<name>"`.
#[derive(Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    /// Snapshot of the recorded calls.
    pub fn calls(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// Recorded calls for one entity, hook names only.
    pub fn calls_for(&self, name: &str) -> Vec<String> {
        let suffix = format!(":{name}");
        self.0
            .borrow()
            .iter()
            .filter_map(|c| c.strip_suffix(&suffix).map(str::to_string))
            .collect()
    }

    /// Number of recorded calls of `hook`.
    pub fn count(&self, hook: &str) -> usize {
        let prefix = format!("{hook}:");
        self.0.borrow().iter().filter(|c| c.starts_with(&prefix)).count()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    fn push(&self, point: HookPoint, name: &str) {
        self.0.borrow_mut().push(format!("{}:{name}", point.as_str()));
    }
}

/// An entity that records every hook invocation.
#[derive(Serialize)]
pub struct Recorder {
    pub id: u32,
    pub name: String,
    pub value: i64,
    #[serde(skip)]
    pub hooks: HookSet,
    #[serde(skip)]
    pub fail_on: Option<HookPoint>,
    #[serde(skip)]
    log: CallLog,
}

impl Recorder {
    pub fn new(id: u32, name: &str, log: &CallLog) -> Self {
        Self {
            id,
            name: name.to_string(),
            value: 0,
            hooks: HookSet::ALL,
            fail_on: None,
            log: log.clone(),
        }
    }

    /// Restricts the hooks this entity implements.
    pub fn with_hooks(mut self, hooks: HookSet) -> Self {
        self.hooks = hooks;
        self
    }

    /// Makes `point` return a callback error after recording the call.
    pub fn failing_on(mut self, point: HookPoint) -> Self {
        self.fail_on = Some(point);
        self
    }

    fn hit(&mut self, point: HookPoint) -> AppResult<()> {
        assert!(self.hooks.contains(point), "{point} invoked but not implemented");
        self.log.push(point, &self.name);
        if self.fail_on == Some(point) {
            return Err(AppError::callback(format!("{} rejected {point}", self.name)));
        }
        Ok(())
    }
}

impl CommitHooks for Recorder {
    fn commit_hooks(&self) -> HookSet {
        self.hooks
    }

    fn before_commit_from_insert(&mut self) -> AppResult<()> {
        self.hit(HookPoint::new(HookPhase::Before, OperationKind::Insert))
    }

    fn before_commit_from_update(&mut self) -> AppResult<()> {
        self.hit(HookPoint::new(HookPhase::Before, OperationKind::Update))
    }

    fn before_commit_from_delete(&mut self) -> AppResult<()> {
        self.hit(HookPoint::new(HookPhase::Before, OperationKind::Delete))
    }

    fn after_commit_from_insert(&mut self) -> AppResult<()> {
        self.hit(HookPoint::new(HookPhase::After, OperationKind::Insert))
    }

    fn after_commit_from_update(&mut self) -> AppResult<()> {
        self.hit(HookPoint::new(HookPhase::After, OperationKind::Update))
    }

    fn after_commit_from_delete(&mut self) -> AppResult<()> {
        self.hit(HookPoint::new(HookPhase::After, OperationKind::Delete))
    }

    fn failed_commit_from_insert(&mut self) -> AppResult<()> {
        self.hit(HookPoint::new(HookPhase::Failed, OperationKind::Insert))
    }

    fn failed_commit_from_update(&mut self) -> AppResult<()> {
        self.hit(HookPoint::new(HookPhase::Failed, OperationKind::Update))
    }

    fn failed_commit_from_delete(&mut self) -> AppResult<()> {
        self.hit(HookPoint::new(HookPhase::Failed, OperationKind::Delete))
    }
}

impl Model for Recorder {
    fn table(&self) -> &'static str {
        "recorders"
    }

    fn primary_key(&self) -> String {
        self.id.to_string()
    }

    fn to_row(&self) -> AppResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A session over a fresh in-memory engine.
pub fn session() -> HookSession<MemoryEngine> {
    HookSession::new(MemoryEngine::new())
}

/// Looks a hook point up by its callback name, e.g. `"failed_commit_from_update"`.
pub fn point(name: &str) -> HookPoint {
    HookPoint::all()
        .find(|p| p.as_str() == name)
        .unwrap_or_else(|| panic!("unknown hook point {name}"))
}
