//! The hookable entity contract.

use crate::result::AppResult;
use crate::types::{HookPhase, HookPoint, HookSet, OperationKind};

/// Commit lifecycle callbacks for a persisted entity.
///
/// Combinations: `(before|after|failed)_commit_from_(insert|update|delete)`.
/// Every method defaults to a no-op; override the ones you need and, to
/// skip dispatch entirely for the rest, narrow [`CommitHooks::commit_hooks`].
///
/// - `before_*` fires at flush time, before the row is written. Changes made
///   to `self` here are included in that write. An error aborts the flush.
/// - `after_*` fires once the transaction has durably committed.
/// - `failed_*` fires once the transaction has failed or been rolled back.
///
/// Errors returned from `after_*`/`failed_*` reach the commit caller but do
/// not change the transaction outcome. They also stop the replay, so hooks
/// that must not starve their siblings should handle their own failures.
pub trait CommitHooks {
    /// Hook points this entity implements. Points outside the set are never
    /// invoked, and an entity whose set has nothing for an operation kind is
    /// not recorded for that operation at all.
    fn commit_hooks(&self) -> HookSet {
        HookSet::ALL
    }

    /// Called when a flush is about to insert this entity.
    fn before_commit_from_insert(&mut self) -> AppResult<()> {
        Ok(())
    }

    /// Called when a flush is about to update this entity.
    fn before_commit_from_update(&mut self) -> AppResult<()> {
        Ok(())
    }

    /// Called when a flush is about to delete this entity.
    fn before_commit_from_delete(&mut self) -> AppResult<()> {
        Ok(())
    }

    /// Called after the transaction that inserted this entity committed.
    fn after_commit_from_insert(&mut self) -> AppResult<()> {
        Ok(())
    }

    /// Called after the transaction that updated this entity committed.
    fn after_commit_from_update(&mut self) -> AppResult<()> {
        Ok(())
    }

    /// Called after the transaction that deleted this entity committed.
    fn after_commit_from_delete(&mut self) -> AppResult<()> {
        Ok(())
    }

    /// Called after the transaction that inserted this entity failed.
    fn failed_commit_from_insert(&mut self) -> AppResult<()> {
        Ok(())
    }

    /// Called after the transaction that updated this entity failed.
    fn failed_commit_from_update(&mut self) -> AppResult<()> {
        Ok(())
    }

    /// Called after the transaction that deleted this entity failed.
    fn failed_commit_from_delete(&mut self) -> AppResult<()> {
        Ok(())
    }
}

/// Invokes the callback for `point` on `entity`.
///
/// Returns `Ok(false)` without calling into the entity when `point` is not
/// in its [`HookSet`].
pub fn invoke(entity: &mut dyn CommitHooks, point: HookPoint) -> AppResult<bool> {
    if !entity.commit_hooks().contains(point) {
        return Ok(false);
    }

    match (point.phase, point.kind) {
        (HookPhase::Before, OperationKind::Insert) => entity.before_commit_from_insert()?,
        (HookPhase::Before, OperationKind::Update) => entity.before_commit_from_update()?,
        (HookPhase::Before, OperationKind::Delete) => entity.before_commit_from_delete()?,
        (HookPhase::After, OperationKind::Insert) => entity.after_commit_from_insert()?,
        (HookPhase::After, OperationKind::Update) => entity.after_commit_from_update()?,
        (HookPhase::After, OperationKind::Delete) => entity.after_commit_from_delete()?,
        (HookPhase::Failed, OperationKind::Insert) => entity.failed_commit_from_insert()?,
        (HookPhase::Failed, OperationKind::Update) => entity.failed_commit_from_update()?,
        (HookPhase::Failed, OperationKind::Delete) => entity.failed_commit_from_delete()?,
    }

    Ok(true)
}
