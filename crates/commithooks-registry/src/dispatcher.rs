//! Outcome dispatcher: replays operation records once a transaction has
//! concluded.
//!
//! - Records are replayed in sequence order, the same order their "before"
//!   callbacks fired in.
//! - `Committed` invokes `after_commit_from_*`, `Failed` invokes
//!   `failed_commit_from_*`, for each record's operation kind.
//! - A callback error stops the replay and is returned to the caller.
//!   Records after the failing one are not dispatched.
//! - Entities the resolver no longer holds are skipped with a warning.

use chrono::Utc;
use tracing::{debug, error, trace, warn};

use commithooks_core::error::AppError;
use commithooks_core::traits::{EntityResolver, invoke};
use commithooks_core::types::{HookPoint, TransactionId};

use crate::definitions::{DispatchReport, OperationRecord, Outcome};

/// Replays records for a single concluded transaction.
#[derive(Debug, Clone, Copy)]
pub struct OutcomeDispatcher {
    /// Transaction the records belong to.
    transaction: TransactionId,
    /// How it concluded.
    outcome: Outcome,
}

impl OutcomeDispatcher {
    /// Creates a dispatcher for `transaction`.
    pub fn new(transaction: TransactionId, outcome: Outcome) -> Self {
        Self {
            transaction,
            outcome,
        }
    }

    /// Invokes the outcome callback for every record, in order.
    pub fn replay(
        &self,
        records: &[OperationRecord],
        resolver: &mut dyn EntityResolver,
    ) -> Result<DispatchReport, AppError> {
        let mut report = DispatchReport::new(self.outcome);
        let phase = self.outcome.phase();

        debug!(
            transaction = %self.transaction,
            outcome = %self.outcome,
            record_count = records.len(),
            "Replaying commit hooks"
        );

        for (index, record) in records.iter().enumerate() {
            let point = HookPoint::new(phase, record.kind());

            let Some(entity) = resolver.resolve(record.entity()) else {
                warn!(
                    transaction = %self.transaction,
                    sequence = %record.sequence(),
                    entity = %record.entity(),
                    hook = %point,
                    "Entity no longer held by the session, skipping hook"
                );
                report.missing += 1;
                continue;
            };

            match invoke(entity, point) {
                Ok(true) => {
                    trace!(
                        transaction = %self.transaction,
                        sequence = %record.sequence(),
                        entity = %record.entity(),
                        hook = %point,
                        queued_ms = (Utc::now() - record.recorded_at()).num_milliseconds(),
                        "Hook invoked"
                    );
                    report.invoked += 1;
                }
                Ok(false) => {
                    report.skipped += 1;
                }
                Err(e) => {
                    error!(
                        transaction = %self.transaction,
                        sequence = %record.sequence(),
                        entity = %record.entity(),
                        hook = %point,
                        error = %e,
                        remaining = records.len() - index - 1,
                        "Hook failed, halting replay"
                    );
                    return Err(e);
                }
            }
        }

        Ok(report)
    }
}
