//! Hook point definitions: phases, operation kinds, and capability sets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why an entity was flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// The entity was written for the first time.
    Insert,
    /// A persistent entity was modified.
    Update,
    /// A persistent entity was removed.
    Delete,
}

impl OperationKind {
    /// All kinds, in the order a flush processes them.
    pub const ALL: [Self; 3] = [Self::Insert, Self::Update, Self::Delete];

    /// Returns the lowercase name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    fn index(self) -> u16 {
        match self {
            Self::Insert => 0,
            Self::Update => 1,
            Self::Delete => 2,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// When a hook fires relative to the transaction outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookPhase {
    /// At flush time, before the write is issued.
    Before,
    /// After the transaction committed.
    After,
    /// After the transaction failed or was rolled back.
    Failed,
}

impl HookPhase {
    /// All phases.
    pub const ALL: [Self; 3] = [Self::Before, Self::After, Self::Failed];

    /// Returns the lowercase name of this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
            Self::Failed => "failed",
        }
    }

    fn index(self) -> u16 {
        match self {
            Self::Before => 0,
            Self::After => 1,
            Self::Failed => 2,
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One of the nine hook slots an entity can implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HookPoint {
    /// When the hook fires.
    pub phase: HookPhase,
    /// Which operation it reports.
    pub kind: OperationKind,
}

impl HookPoint {
    /// Creates a hook point.
    pub const fn new(phase: HookPhase, kind: OperationKind) -> Self {
        Self { phase, kind }
    }

    /// Returns the callback method name, e.g. `"after_commit_from_delete"`.
    pub fn as_str(&self) -> &'static str {
        match (self.phase, self.kind) {
            (HookPhase::Before, OperationKind::Insert) => "before_commit_from_insert",
            (HookPhase::Before, OperationKind::Update) => "before_commit_from_update",
            (HookPhase::Before, OperationKind::Delete) => "before_commit_from_delete",
            (HookPhase::After, OperationKind::Insert) => "after_commit_from_insert",
            (HookPhase::After, OperationKind::Update) => "after_commit_from_update",
            (HookPhase::After, OperationKind::Delete) => "after_commit_from_delete",
            (HookPhase::Failed, OperationKind::Insert) => "failed_commit_from_insert",
            (HookPhase::Failed, OperationKind::Update) => "failed_commit_from_update",
            (HookPhase::Failed, OperationKind::Delete) => "failed_commit_from_delete",
        }
    }

    /// Returns an iterator over all nine hook points.
    pub fn all() -> impl Iterator<Item = Self> {
        HookPhase::ALL
            .into_iter()
            .flat_map(|phase| OperationKind::ALL.into_iter().map(move |kind| Self::new(phase, kind)))
    }

    fn bit(self) -> u16 {
        1 << (self.phase.index() * 3 + self.kind.index())
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The subset of hook points an entity type implements.
///
/// Checked before every dispatch, so an entity that leaves a point out of
/// its set is never called for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HookSet(u16);

impl HookSet {
    /// No hook points.
    pub const EMPTY: Self = Self(0);
    /// All nine hook points.
    pub const ALL: Self = Self(0x1ff);

    /// Builds a set from a list of points.
    pub fn of(points: &[HookPoint]) -> Self {
        points.iter().fold(Self::EMPTY, |set, p| set.with(*p))
    }

    /// Returns a copy of this set with `point` added.
    pub fn with(self, point: HookPoint) -> Self {
        Self(self.0 | point.bit())
    }

    /// Returns a copy of this set with `point` removed.
    pub fn without(self, point: HookPoint) -> Self {
        Self(self.0 & !point.bit())
    }

    /// Returns whether `point` is in the set.
    pub fn contains(&self, point: HookPoint) -> bool {
        self.0 & point.bit() != 0
    }

    /// Returns whether any phase is implemented for `kind`.
    pub fn covers(&self, kind: OperationKind) -> bool {
        HookPhase::ALL
            .into_iter()
            .any(|phase| self.contains(HookPoint::new(phase, kind)))
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns the number of points in the set.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }
}
