//! Persistence engine collaborator trait.

use serde_json::Value;

use crate::result::AppResult;
use crate::types::TransactionId;

/// The storage layer a session drives.
///
/// Writes are issued per flush and only become visible once
/// [`PersistenceEngine::commit`] succeeds. A failed commit must leave the
/// engine as if the transaction never happened.
pub trait PersistenceEngine {
    /// Opens a new transaction.
    fn begin(&mut self) -> AppResult<TransactionId>;

    /// Writes a new row. Fails with `Conflict` if the key already exists.
    fn insert(&mut self, txn: TransactionId, table: &str, key: &str, row: Value) -> AppResult<()>;

    /// Replaces an existing row. Fails with `NotFound` if it does not exist.
    fn update(&mut self, txn: TransactionId, table: &str, key: &str, row: Value) -> AppResult<()>;

    /// Removes an existing row. Fails with `NotFound` if it does not exist.
    fn delete(&mut self, txn: TransactionId, table: &str, key: &str) -> AppResult<()>;

    /// Durably applies all writes of `txn`.
    fn commit(&mut self, txn: TransactionId) -> AppResult<()>;

    /// Discards all writes of `txn`.
    fn rollback(&mut self, txn: TransactionId) -> AppResult<()>;
}
