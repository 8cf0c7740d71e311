//! Entity lookup used at dispatch time.

use super::hooks::CommitHooks;
use crate::types::EntityKey;

/// Resolves entity handles to the live entities they refer to.
///
/// Operation records only carry an [`EntityKey`]; whoever owns the entities
/// (normally a session's identity map) lends them out through this trait
/// for the duration of one callback.
pub trait EntityResolver {
    /// Returns the entity for `key`, or `None` if it is no longer held.
    fn resolve(&mut self, key: EntityKey) -> Option<&mut dyn CommitHooks>;
}
