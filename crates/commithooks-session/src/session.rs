//! Hook-aware session: a unit of work that drives the hook registry from
//! its own flush, commit, and rollback.

use tracing::{debug, error, info, warn};

use commithooks_core::config::hooks::HookConfig;
use commithooks_core::error::{AppError, ErrorKind};
use commithooks_core::result::AppResult;
use commithooks_core::traits::{Model, PersistenceEngine};
use commithooks_core::types::{EntityKey, OperationKind, TransactionId};
use commithooks_registry::{DispatchReport, FlushReport, FlushSnapshot, Outcome, TransactionHookRegistry};

use crate::identity::{EntityState, IdentityMap};

/// Unit of work over a [`PersistenceEngine`] that fires entity commit hooks.
///
/// Entities are handed to the session with [`add`](Self::add) and addressed
/// by the returned [`EntityKey`] afterwards. "before" hooks fire during
/// [`flush`](Self::flush); "after" or "failed" hooks fire once
/// [`commit`](Self::commit) or [`rollback`](Self::rollback) has settled the
/// engine transaction.
#[derive(Debug)]
pub struct HookSession<E: PersistenceEngine> {
    engine: E,
    config: HookConfig,
    identity: IdentityMap,
    registry: TransactionHookRegistry,
    /// Engine transaction opened by the first flush.
    transaction: Option<TransactionId>,
    /// Set when a flush failed; the transaction must be rolled back.
    poisoned: Option<AppError>,
}

impl<E: PersistenceEngine> HookSession<E> {
    /// Creates a session with the default [`HookConfig`].
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, HookConfig::default())
    }

    /// Creates a session with an explicit configuration.
    pub fn with_config(engine: E, config: HookConfig) -> Self {
        Self {
            engine,
            config,
            identity: IdentityMap::new(),
            registry: TransactionHookRegistry::new(),
            transaction: None,
            poisoned: None,
        }
    }

    /// Tracks a new entity and schedules its insert.
    pub fn add<M: Model>(&mut self, model: M) -> EntityKey {
        self.identity.add(Box::new(model))
    }

    /// Returns a tracked entity as `T`.
    pub fn get<T: Model>(&self, key: EntityKey) -> Option<&T> {
        self.identity.get(key)
    }

    /// Returns a tracked entity as `&mut T`, scheduling an update if it is
    /// already persistent.
    pub fn get_mut<T: Model>(&mut self, key: EntityKey) -> Option<&mut T> {
        self.identity.get_mut(key)
    }

    /// Schedules a delete. See [`IdentityMap::delete`].
    pub fn delete(&mut self, key: EntityKey) -> AppResult<()> {
        self.identity.delete(key)
    }

    /// Returns whether the entity is tracked.
    pub fn contains(&self, key: EntityKey) -> bool {
        self.identity.contains(key)
    }

    /// Returns the persistence state of a tracked entity.
    pub fn state(&self, key: EntityKey) -> Option<EntityState> {
        self.identity.state(key)
    }

    /// Writes pending changes to the engine, firing "before" hooks.
    ///
    /// Opens an engine transaction on the first flush that has anything to
    /// write. A hook or write error leaves the transaction inactive: the
    /// error is returned and every later flush or commit is refused until
    /// [`rollback`](Self::rollback).
    pub fn flush(&mut self) -> AppResult<FlushReport> {
        if let Some(cause) = &self.poisoned {
            return Err(AppError::transaction(format!(
                "transaction is inactive after a failed flush, roll back first: {cause}"
            )));
        }

        if !self.identity.has_pending() {
            return Ok(FlushReport::default());
        }

        let txn = self.ensure_transaction()?;
        let snapshot = self.identity.take_pending();

        let result = match self.registry.record_flush(txn, &snapshot, &mut self.identity) {
            Ok(report) => self.write(txn, &snapshot).map(|()| report),
            Err(e) => Err(e),
        };

        match result {
            Ok(report) => {
                debug!(
                    transaction = %txn,
                    written = snapshot.len(),
                    recorded = report.recorded,
                    "Flush complete"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(transaction = %txn, error = %e, "Flush failed, transaction is now inactive");
                self.poisoned = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Flushes (when configured), commits the engine transaction, and
    /// dispatches the outcome hooks.
    ///
    /// Returns `Ok(None)` when no transaction was open. A failed engine
    /// commit is rolled back, "failed" hooks are dispatched, and the commit
    /// error is returned.
    pub fn commit(&mut self) -> AppResult<Option<DispatchReport>> {
        if let Some(cause) = self.poisoned.clone() {
            if let Err(rollback_err) = self.rollback() {
                error!(error = %cause, "Commit refused on inactive transaction, rollback also failed");
                return Err(rollback_err);
            }
            return Err(AppError::with_source(
                ErrorKind::Transaction,
                "commit refused, transaction was inactive after a failed flush and has been rolled back",
                cause,
            ));
        }

        if self.config.flush_on_commit {
            if let Err(flush_err) = self.flush() {
                if let Err(rollback_err) = self.rollback() {
                    error!(error = %flush_err, "Flush failed during commit, rollback also failed");
                    return Err(rollback_err);
                }
                return Err(flush_err);
            }
        }

        let Some(txn) = self.transaction else {
            return Ok(None);
        };

        match self.engine.commit(txn) {
            Ok(()) => self.conclude(Outcome::Committed),
            Err(commit_err) => {
                warn!(transaction = %txn, error = %commit_err, "Commit failed, rolling back");
                if let Err(e) = self.engine.rollback(txn) {
                    error!(transaction = %txn, error = %e, "Rollback after failed commit failed");
                }

                match self.conclude(Outcome::Failed) {
                    Ok(_) => Err(commit_err),
                    Err(hook_err) => {
                        error!(
                            transaction = %txn,
                            error = %commit_err,
                            "Commit failed and a failed hook also returned an error"
                        );
                        Err(hook_err)
                    }
                }
            }
        }
    }

    /// Rolls back the engine transaction and dispatches "failed" hooks for
    /// everything flushed in it.
    ///
    /// Without an open transaction this only discards pending changes. An
    /// error from a "failed" hook is returned after the session is reset.
    pub fn rollback(&mut self) -> AppResult<Option<DispatchReport>> {
        let Some(txn) = self.transaction else {
            self.identity.finish(Outcome::Failed);
            return Ok(None);
        };

        let engine_result = self.engine.rollback(txn);

        if self.before_hook_failed() && !self.config.replay_failed_after_flush_error {
            self.registry.abandon();
        }

        let report = self.conclude(Outcome::Failed);
        engine_result?;
        report
    }

    /// Returns whether an engine transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Returns whether a failed flush left the transaction inactive.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// The session's hook registry.
    pub fn registry(&self) -> &TransactionHookRegistry {
        &self.registry
    }

    /// The session's configuration.
    pub fn config(&self) -> &HookConfig {
        &self.config
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The wrapped engine, mutably.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Whether the transaction was poisoned by a "before" hook rather than
    /// by an engine write.
    fn before_hook_failed(&self) -> bool {
        self.poisoned
            .as_ref()
            .is_some_and(|cause| cause.is(ErrorKind::Callback))
    }

    fn ensure_transaction(&mut self) -> AppResult<TransactionId> {
        if let Some(txn) = self.transaction {
            return Ok(txn);
        }

        let txn = self.engine.begin()?;
        self.registry.begin(txn)?;
        self.transaction = Some(txn);
        debug!(transaction = %txn, "Session transaction opened");
        Ok(txn)
    }

    /// Issues the engine writes for a snapshot, inserts first.
    fn write(&mut self, txn: TransactionId, snapshot: &FlushSnapshot) -> AppResult<()> {
        for (kind, key) in snapshot.iter() {
            let model = self
                .identity
                .model(key)
                .ok_or_else(|| AppError::not_found(format!("flushed entity {key} is not tracked")))?;
            let table = model.table();
            let pk = model.primary_key();

            let result = match kind {
                OperationKind::Insert => model
                    .to_row()
                    .and_then(|row| self.engine.insert(txn, table, &pk, row)),
                OperationKind::Update => model
                    .to_row()
                    .and_then(|row| self.engine.update(txn, table, &pk, row)),
                OperationKind::Delete => self.engine.delete(txn, table, &pk),
            };

            result.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Flush,
                    format!("failed to {} {table}/{pk}", kind.as_str()),
                    e,
                )
            })?;
            self.identity.mark_flushed(key, kind);
        }

        Ok(())
    }

    /// Dispatches `outcome` and resets the session for the next transaction.
    fn conclude(&mut self, outcome: Outcome) -> AppResult<Option<DispatchReport>> {
        let result = if self.registry.has_flushed() {
            self.registry.resolve(outcome, &mut self.identity)
        } else {
            Ok(DispatchReport::new(outcome))
        };

        self.identity.finish(outcome);
        self.registry.clear();
        if let Some(txn) = self.transaction.take() {
            info!(transaction = %txn, outcome = %outcome, "Session transaction concluded");
        }
        self.poisoned = None;

        result.map(Some)
    }
}
