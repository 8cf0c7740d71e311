//! Persistable entity contract used by sessions and engines.

use std::any::Any;

use serde_json::Value;

use super::hooks::CommitHooks;
use crate::result::AppResult;

/// Downcasting support for trait objects. Implemented for every `'static`
/// type.
pub trait AsAny: Any {
    /// Returns `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;

    /// Returns `self` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Views a model as its hook callbacks. Implemented for every
/// [`CommitHooks`] type.
pub trait AsCommitHooks {
    /// Returns `self` as `&mut dyn CommitHooks`.
    fn as_commit_hooks(&mut self) -> &mut dyn CommitHooks;
}

impl<T: CommitHooks> AsCommitHooks for T {
    fn as_commit_hooks(&mut self) -> &mut dyn CommitHooks {
        self
    }
}

/// An entity that a session can track and a persistence engine can write.
///
/// ```ignore
/// #[derive(Serialize)]
/// struct Invoice { id: u32, total: i64 }
///
/// impl CommitHooks for Invoice {
///     fn after_commit_from_insert(&mut self) -> AppResult<()> {
///         billing::push(self.id)
///     }
/// }
///
/// impl Model for Invoice {
///     fn table(&self) -> &'static str { "invoices" }
///     fn primary_key(&self) -> String { self.id.to_string() }
///     fn to_row(&self) -> AppResult<Value> { Ok(serde_json::to_value(self)?) }
/// }
/// ```
pub trait Model: CommitHooks + AsCommitHooks + AsAny {
    /// Table the entity is stored in.
    fn table(&self) -> &'static str;

    /// Primary key, unique within the table.
    fn primary_key(&self) -> String;

    /// Serializes the current state of the entity into a row.
    fn to_row(&self) -> AppResult<Value>;
}
