//! Operation records, flush snapshots, and dispatch reports.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use commithooks_core::types::{EntityKey, HookPhase, OperationKind, Sequence};

/// One entity flushed with one operation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    entity: EntityKey,
    kind: OperationKind,
    sequence: Sequence,
    recorded_at: DateTime<Utc>,
}

impl OperationRecord {
    /// Creates a record stamped with the current time.
    pub fn new(entity: EntityKey, kind: OperationKind, sequence: Sequence) -> Self {
        Self {
            entity,
            kind,
            sequence,
            recorded_at: Utc::now(),
        }
    }

    /// Handle of the flushed entity.
    pub fn entity(&self) -> EntityKey {
        self.entity
    }

    /// Why the entity was flushed.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Position of this record within its transaction.
    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    /// When the record was created.
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

/// The insert/update/delete sets of a single flush, captured at the instant
/// of flush. Order within each set is the order the collaborator reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushSnapshot {
    inserts: Vec<EntityKey>,
    updates: Vec<EntityKey>,
    deletes: Vec<EntityKey>,
}

impl FlushSnapshot {
    /// Creates a snapshot from the three pending sets.
    pub fn new(inserts: Vec<EntityKey>, updates: Vec<EntityKey>, deletes: Vec<EntityKey>) -> Self {
        Self {
            inserts,
            updates,
            deletes,
        }
    }

    /// Keys flushed with `kind`, in reported order.
    pub fn keys(&self, kind: OperationKind) -> &[EntityKey] {
        match kind {
            OperationKind::Insert => &self.inserts,
            OperationKind::Update => &self.updates,
            OperationKind::Delete => &self.deletes,
        }
    }

    /// Iterates `(kind, key)` pairs: all inserts, then updates, then deletes.
    pub fn iter(&self) -> impl Iterator<Item = (OperationKind, EntityKey)> + '_ {
        OperationKind::ALL
            .into_iter()
            .flat_map(move |kind| self.keys(kind).iter().map(move |key| (kind, *key)))
    }

    /// Total number of keys across the three sets.
    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }

    /// Returns whether all three sets are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How a transaction concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The commit durably applied.
    Committed,
    /// The commit raised, or the transaction was rolled back.
    Failed,
}

impl Outcome {
    /// The hook phase replayed for this outcome.
    pub fn phase(&self) -> HookPhase {
        match self {
            Self::Committed => HookPhase::After,
            Self::Failed => HookPhase::Failed,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Committed => write!(f, "committed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Lifecycle state of a [`crate::TransactionHookRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistryState {
    /// No records; waiting for the first flush.
    #[default]
    Idle,
    /// "before" callbacks are being dispatched.
    Flushing,
    /// At least one record exists; waiting for the transaction to conclude.
    AwaitingOutcome,
    /// Outcome callbacks were dispatched. Terminal until cleared.
    Resolved(Outcome),
}

impl fmt::Display for RegistryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Flushing => write!(f, "flushing"),
            Self::AwaitingOutcome => write!(f, "awaiting_outcome"),
            Self::Resolved(outcome) => write!(f, "resolved_{outcome}"),
        }
    }
}

/// Summary of one flush pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Records appended (one "before" callback attempted per record).
    pub recorded: usize,
    /// Entities not recorded because they implement no hook for the
    /// operation.
    pub skipped: usize,
    /// The flush arrived while "before" callbacks were running and was left
    /// for the next flush boundary.
    pub deferred: bool,
}

impl FlushReport {
    /// Report for a flush that was refused by the re-entrancy guard.
    pub fn deferred() -> Self {
        Self {
            deferred: true,
            ..Self::default()
        }
    }
}

/// Summary of one outcome replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// The outcome that was replayed.
    pub outcome: Outcome,
    /// Callbacks invoked.
    pub invoked: usize,
    /// Records whose entity does not implement the outcome hook.
    pub skipped: usize,
    /// Records whose entity was no longer held by the resolver.
    pub missing: usize,
}

impl DispatchReport {
    /// An empty report for `outcome`.
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            invoked: 0,
            skipped: 0,
            missing: 0,
        }
    }
}
