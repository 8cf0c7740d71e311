//! Identity map: the session-owned table of tracked entities and their
//! pending changes.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::debug;

use commithooks_core::error::AppError;
use commithooks_core::result::AppResult;
use commithooks_core::traits::{CommitHooks, EntityResolver, Model};
use commithooks_core::types::{EntityKey, OperationKind};
use commithooks_registry::{FlushSnapshot, Outcome};

/// Persistence state of a tracked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Added to the session but not yet written.
    Pending,
    /// Written to the engine (possibly not yet committed).
    Persistent,
    /// Delete was written; evicted once the transaction concludes.
    Deleted,
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Persistent => write!(f, "persistent"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

struct Slot {
    model: Box<dyn Model>,
    state: EntityState,
}

impl Slot {
    fn model(&self) -> &dyn Model {
        &*self.model
    }

    fn model_mut(&mut self) -> &mut dyn Model {
        &mut *self.model
    }
}

/// Insertion-ordered set of keys.
#[derive(Debug, Default)]
struct PendingSet {
    order: Vec<EntityKey>,
    members: HashSet<EntityKey>,
}

impl PendingSet {
    fn insert(&mut self, key: EntityKey) {
        if self.members.insert(key) {
            self.order.push(key);
        }
    }

    fn remove(&mut self, key: EntityKey) {
        if self.members.remove(&key) {
            self.order.retain(|k| *k != key);
        }
    }

    fn contains(&self, key: EntityKey) -> bool {
        self.members.contains(&key)
    }

    fn take(&mut self) -> Vec<EntityKey> {
        self.members.clear();
        std::mem::take(&mut self.order)
    }

    fn clear(&mut self) {
        self.members.clear();
        self.order.clear();
    }
}

/// Entities tracked by a session, keyed by [`EntityKey`].
///
/// The map owns the entities; operation records only hold keys and borrow
/// entities back through [`EntityResolver`] at dispatch time.
#[derive(Default)]
pub struct IdentityMap {
    slots: HashMap<EntityKey, Slot>,
    inserts: PendingSet,
    updates: PendingSet,
    deletes: PendingSet,
    /// Keys whose insert was written in the open transaction.
    inserted: HashSet<EntityKey>,
}

impl IdentityMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a new entity and schedules its insert.
    pub fn add(&mut self, model: Box<dyn Model>) -> EntityKey {
        let key = EntityKey::new();
        debug!(entity = %key, table = model.table(), "Entity added");
        self.slots.insert(
            key,
            Slot {
                model,
                state: EntityState::Pending,
            },
        );
        self.inserts.insert(key);
        key
    }

    /// Returns the entity as `T`, or `None` if absent or of another type.
    pub fn get<T: Model>(&self, key: EntityKey) -> Option<&T> {
        self.slots.get(&key)?.model().as_any().downcast_ref::<T>()
    }

    /// Returns the entity as `&mut T`. A persistent entity is scheduled for
    /// update, since the caller may change it.
    pub fn get_mut<T: Model>(&mut self, key: EntityKey) -> Option<&mut T> {
        let slot = self.slots.get_mut(&key)?;
        let state = slot.state;
        let model = slot.model_mut().as_any_mut().downcast_mut::<T>()?;

        if state == EntityState::Persistent && !self.deletes.contains(key) {
            self.updates.insert(key);
        }
        Some(model)
    }

    /// Returns the entity as a model trait object.
    pub fn model(&self, key: EntityKey) -> Option<&dyn Model> {
        self.slots.get(&key).map(Slot::model)
    }

    /// Schedules a delete.
    ///
    /// A pending entity that was never written is dropped on the spot and
    /// fires no hooks. Deleting an entity whose delete was already written
    /// is a no-op.
    pub fn delete(&mut self, key: EntityKey) -> AppResult<()> {
        let state = self
            .slots
            .get(&key)
            .map(|slot| slot.state)
            .ok_or_else(|| AppError::not_found(format!("entity {key} is not tracked by this session")))?;

        match state {
            EntityState::Pending => {
                self.inserts.remove(key);
                self.slots.remove(&key);
                debug!(entity = %key, "Pending entity expunged");
            }
            EntityState::Persistent => {
                self.updates.remove(key);
                self.deletes.insert(key);
            }
            EntityState::Deleted => {}
        }
        Ok(())
    }

    /// Returns the state of a tracked entity.
    pub fn state(&self, key: EntityKey) -> Option<EntityState> {
        self.slots.get(&key).map(|slot| slot.state)
    }

    /// Returns whether the entity is tracked.
    pub fn contains(&self, key: EntityKey) -> bool {
        self.slots.contains_key(&key)
    }

    /// Number of tracked entities.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns whether no entities are tracked.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns whether any insert, update, or delete is scheduled.
    pub fn has_pending(&self) -> bool {
        !(self.inserts.order.is_empty() && self.updates.order.is_empty() && self.deletes.order.is_empty())
    }

    /// Captures and clears the pending sets.
    pub fn take_pending(&mut self) -> FlushSnapshot {
        FlushSnapshot::new(self.inserts.take(), self.updates.take(), self.deletes.take())
    }

    /// Records that the write for `kind` reached the engine.
    pub fn mark_flushed(&mut self, key: EntityKey, kind: OperationKind) {
        let Some(slot) = self.slots.get_mut(&key) else {
            return;
        };
        match kind {
            OperationKind::Insert => {
                slot.state = EntityState::Persistent;
                self.inserted.insert(key);
            }
            OperationKind::Update => {}
            OperationKind::Delete => slot.state = EntityState::Deleted,
        }
    }

    /// Settles entity states once the transaction has concluded.
    ///
    /// On commit, deleted entities are evicted. On failure, pending entities
    /// and entities inserted by the transaction are evicted, deleted ones
    /// become persistent again, and all scheduled changes are dropped.
    pub fn finish(&mut self, outcome: Outcome) {
        let before = self.slots.len();
        match outcome {
            Outcome::Committed => {
                self.slots.retain(|_, slot| slot.state != EntityState::Deleted);
            }
            Outcome::Failed => {
                let inserted = std::mem::take(&mut self.inserted);
                self.slots
                    .retain(|key, slot| slot.state != EntityState::Pending && !inserted.contains(key));
                for slot in self.slots.values_mut() {
                    slot.state = EntityState::Persistent;
                }
                self.inserts.clear();
                self.updates.clear();
                self.deletes.clear();
            }
        }
        self.inserted.clear();

        debug!(
            outcome = %outcome,
            evicted = before - self.slots.len(),
            tracked = self.slots.len(),
            "Identity map settled"
        );
    }
}

impl EntityResolver for IdentityMap {
    fn resolve(&mut self, key: EntityKey) -> Option<&mut dyn CommitHooks> {
        self.slots
            .get_mut(&key)
            .map(|slot| slot.model_mut().as_commit_hooks())
    }
}

impl fmt::Debug for IdentityMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityMap")
            .field("tracked", &self.slots.len())
            .field("inserts", &self.inserts.order)
            .field("updates", &self.updates.order)
            .field("deletes", &self.deletes.order)
            .finish()
    }
}
