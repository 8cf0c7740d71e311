//! Transaction hook registry: records flushed entities and resolves them
//! once the transaction concludes.

use tracing::{debug, info, warn};

use commithooks_core::error::AppError;
use commithooks_core::result::AppResult;
use commithooks_core::traits::{EntityResolver, invoke};
use commithooks_core::types::{HookPhase, HookPoint, Sequence, TransactionId};

use crate::definitions::{DispatchReport, FlushReport, FlushSnapshot, OperationRecord, Outcome, RegistryState};
use crate::dispatcher::OutcomeDispatcher;

/// Ordered operation records for the one transaction currently bound to
/// this registry.
///
/// A registry is bound to a transaction by [`begin`](Self::begin) or lazily
/// by the first [`record_flush`](Self::record_flush), and must be
/// [`clear`](Self::clear)ed before it can serve another transaction.
#[derive(Debug)]
pub struct TransactionHookRegistry {
    /// Transaction the records belong to.
    transaction: Option<TransactionId>,
    /// Records in sequence order.
    records: Vec<OperationRecord>,
    /// Sequence assigned to the next record.
    next_sequence: Sequence,
    /// Lifecycle state.
    state: RegistryState,
    /// Set while "before" callbacks run.
    dispatching: bool,
}

impl TransactionHookRegistry {
    /// Creates an idle, unbound registry.
    pub fn new() -> Self {
        Self {
            transaction: None,
            records: Vec::new(),
            next_sequence: Sequence::FIRST,
            state: RegistryState::Idle,
            dispatching: false,
        }
    }

    /// Binds the registry to `txn`. Binding again to the same transaction
    /// is a no-op.
    pub fn begin(&mut self, txn: TransactionId) -> AppResult<()> {
        if let RegistryState::Resolved(outcome) = self.state {
            return Err(AppError::ordering(format!(
                "registry already resolved ({outcome}) for transaction {}; clear it before reuse",
                self.transaction.map(|t| t.to_string()).unwrap_or_default()
            )));
        }

        match self.transaction {
            Some(current) if current == txn => Ok(()),
            Some(current) => Err(AppError::ordering(format!(
                "registry is bound to transaction {current}, refusing transaction {txn}"
            ))),
            None => {
                debug!(transaction = %txn, "Hook registry bound to transaction");
                self.transaction = Some(txn);
                Ok(())
            }
        }
    }

    /// Records every entity in `snapshot` and fires its "before" callback.
    ///
    /// Sets are processed insert, then update, then delete; each entity gets
    /// the next sequence number and its record is appended before the
    /// callback runs. Entities whose hook set has nothing for the operation
    /// are not recorded.
    ///
    /// While callbacks are running the registry refuses nested flushes: such
    /// a call returns a report with `deferred` set and records nothing, and
    /// the pending changes are picked up by the next flush.
    ///
    /// A callback error is returned unchanged. Records appended so far stay
    /// queued, including the one whose callback failed, so a later
    /// [`Outcome::Failed`] can still reach them.
    pub fn record_flush(
        &mut self,
        txn: TransactionId,
        snapshot: &FlushSnapshot,
        resolver: &mut dyn EntityResolver,
    ) -> AppResult<FlushReport> {
        if self.dispatching {
            debug!(
                transaction = %txn,
                pending = snapshot.len(),
                "Flush requested from inside a before hook, deferring"
            );
            return Ok(FlushReport::deferred());
        }

        self.begin(txn)?;

        if snapshot.is_empty() {
            return Ok(FlushReport::default());
        }

        self.state = RegistryState::Flushing;
        self.dispatching = true;
        let mut report = FlushReport::default();
        let result = self.dispatch_before(txn, snapshot, resolver, &mut report);
        self.dispatching = false;
        self.state = if self.records.is_empty() {
            RegistryState::Idle
        } else {
            RegistryState::AwaitingOutcome
        };

        debug!(
            transaction = %txn,
            recorded = report.recorded,
            skipped = report.skipped,
            total_records = self.records.len(),
            "Flush recorded"
        );

        result.map(|()| report)
    }

    fn dispatch_before(
        &mut self,
        txn: TransactionId,
        snapshot: &FlushSnapshot,
        resolver: &mut dyn EntityResolver,
        report: &mut FlushReport,
    ) -> AppResult<()> {
        for (kind, key) in snapshot.iter() {
            let entity = resolver.resolve(key).ok_or_else(|| {
                AppError::not_found(format!("flushed entity {key} is not held by the session"))
            })?;

            if !entity.commit_hooks().covers(kind) {
                report.skipped += 1;
                continue;
            }

            let sequence = self.next_sequence;
            self.next_sequence = sequence.next();
            self.records.push(OperationRecord::new(key, kind, sequence));
            report.recorded += 1;

            let point = HookPoint::new(HookPhase::Before, kind);
            debug!(
                transaction = %txn,
                sequence = %sequence,
                entity = %key,
                hook = %point,
                "Dispatching before hook"
            );
            invoke(entity, point)?;
        }

        Ok(())
    }

    /// Replays all records for `outcome`, in sequence order.
    ///
    /// Fails with an ordering error if nothing was recorded or the registry
    /// was already resolved. The records are taken out of the registry
    /// before the replay starts, so a callback error that halts the replay
    /// never leads to a second dispatch of the same record.
    pub fn resolve(
        &mut self,
        outcome: Outcome,
        resolver: &mut dyn EntityResolver,
    ) -> AppResult<DispatchReport> {
        let txn = match (self.state, self.transaction) {
            (RegistryState::AwaitingOutcome, Some(txn)) => txn,
            (RegistryState::Resolved(previous), _) => {
                return Err(AppError::ordering(format!(
                    "registry already resolved ({previous}), refusing to dispatch {outcome}"
                )));
            }
            (RegistryState::Flushing, _) => {
                return Err(AppError::ordering(format!(
                    "cannot dispatch {outcome} while before hooks are running"
                )));
            }
            _ => {
                return Err(AppError::ordering(format!(
                    "cannot dispatch {outcome}: no operation records are queued for this transaction"
                )));
            }
        };

        let records = std::mem::take(&mut self.records);
        self.state = RegistryState::Resolved(outcome);

        info!(
            transaction = %txn,
            outcome = %outcome,
            record_count = records.len(),
            "Transaction resolved"
        );

        OutcomeDispatcher::new(txn, outcome).replay(&records, resolver)
    }

    /// Discards all records and unbinds the registry, returning it to idle.
    pub fn clear(&mut self) {
        if let Some(txn) = self.transaction {
            debug!(transaction = %txn, state = %self.state, "Hook registry cleared");
        }
        self.transaction = None;
        self.records.clear();
        self.next_sequence = Sequence::FIRST;
        self.state = RegistryState::Idle;
        self.dispatching = false;
    }

    /// Clears a registry whose records will never get an outcome dispatch.
    pub fn abandon(&mut self) {
        if let (Some(txn), false) = (self.transaction, self.records.is_empty()) {
            warn!(
                transaction = %txn,
                record_count = self.records.len(),
                "Discarding operation records without outcome hooks"
            );
        }
        self.clear();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RegistryState {
        self.state
    }

    /// Transaction the registry is bound to.
    pub fn transaction(&self) -> Option<TransactionId> {
        self.transaction
    }

    /// Records awaiting an outcome, in sequence order.
    pub fn records(&self) -> &[OperationRecord] {
        &self.records
    }

    /// Number of records awaiting an outcome.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns whether no records are awaiting an outcome.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns whether "before" callbacks are currently running.
    pub fn is_dispatching(&self) -> bool {
        self.dispatching
    }

    /// Returns whether records are waiting for an outcome dispatch.
    pub fn has_flushed(&self) -> bool {
        self.state == RegistryState::AwaitingOutcome
    }
}

impl Default for TransactionHookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
