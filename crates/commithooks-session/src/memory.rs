//! In-memory persistence engine.
//!
//! Keeps committed rows in ordered maps and buffers each transaction's
//! writes in a log that is applied atomically on commit. Intended for tests
//! and demos, so it also supports injecting a commit failure.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use commithooks_core::error::AppError;
use commithooks_core::result::AppResult;
use commithooks_core::traits::PersistenceEngine;
use commithooks_core::types::TransactionId;

/// A buffered write.
#[derive(Debug, Clone)]
enum Write {
    Upsert { table: String, key: String, row: Value },
    Delete { table: String, key: String },
}

impl Write {
    fn target(&self) -> (&str, &str) {
        match self {
            Self::Upsert { table, key, .. } | Self::Delete { table, key } => {
                (table.as_str(), key.as_str())
            }
        }
    }
}

/// The open transaction and its write log.
#[derive(Debug)]
struct OpenTransaction {
    id: TransactionId,
    log: Vec<Write>,
}

/// Transactional in-memory table store.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    /// Table name → primary key → committed row.
    tables: HashMap<String, BTreeMap<String, Value>>,
    /// At most one open transaction.
    open: Option<OpenTransaction>,
    /// Reason the next commit should fail with.
    fail_next_commit: Option<String>,
    /// Number of successful commits.
    commit_count: u64,
    /// Time of the last successful commit.
    last_commit_at: Option<DateTime<Utc>>,
}

impl MemoryEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next [`commit`](PersistenceEngine::commit) fail with
    /// `reason`. The transaction stays open so it can be rolled back.
    pub fn fail_next_commit(&mut self, reason: impl Into<String>) {
        self.fail_next_commit = Some(reason.into());
    }

    /// Returns a committed row.
    pub fn row(&self, table: &str, key: &str) -> Option<&Value> {
        self.tables.get(table)?.get(key)
    }

    /// Number of committed rows in `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map(BTreeMap::len).unwrap_or(0)
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> u64 {
        self.commit_count
    }

    /// Time of the last successful commit.
    pub fn last_commit_at(&self) -> Option<DateTime<Utc>> {
        self.last_commit_at
    }

    /// Returns whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.open.is_some()
    }

    fn open_mut(&mut self, txn: TransactionId) -> AppResult<&mut OpenTransaction> {
        match self.open.as_mut() {
            Some(open) if open.id == txn => Ok(open),
            Some(open) => Err(AppError::transaction(format!(
                "transaction {txn} is not open (open transaction is {})",
                open.id
            ))),
            None => Err(AppError::transaction(format!("transaction {txn} is not open"))),
        }
    }

    /// Whether `table/key` exists as seen from inside `txn`.
    fn visible(&self, txn: TransactionId, table: &str, key: &str) -> bool {
        let logged = self
            .open
            .as_ref()
            .filter(|open| open.id == txn)
            .and_then(|open| open.log.iter().rev().find(|w| w.target() == (table, key)));

        match logged {
            Some(Write::Upsert { .. }) => true,
            Some(Write::Delete { .. }) => false,
            None => self.row(table, key).is_some(),
        }
    }
}

impl PersistenceEngine for MemoryEngine {
    fn begin(&mut self) -> AppResult<TransactionId> {
        if let Some(open) = &self.open {
            return Err(AppError::transaction(format!(
                "transaction {} is already open",
                open.id
            )));
        }

        let id = TransactionId::new();
        self.open = Some(OpenTransaction {
            id,
            log: Vec::new(),
        });
        debug!(transaction = %id, "Transaction started");
        Ok(id)
    }

    fn insert(&mut self, txn: TransactionId, table: &str, key: &str, row: Value) -> AppResult<()> {
        if self.visible(txn, table, key) {
            return Err(AppError::conflict(format!(
                "duplicate primary key '{key}' in table '{table}'"
            )));
        }

        self.open_mut(txn)?.log.push(Write::Upsert {
            table: table.to_string(),
            key: key.to_string(),
            row,
        });
        Ok(())
    }

    fn update(&mut self, txn: TransactionId, table: &str, key: &str, row: Value) -> AppResult<()> {
        if !self.visible(txn, table, key) {
            return Err(AppError::not_found(format!(
                "no row '{key}' in table '{table}' to update"
            )));
        }

        self.open_mut(txn)?.log.push(Write::Upsert {
            table: table.to_string(),
            key: key.to_string(),
            row,
        });
        Ok(())
    }

    fn delete(&mut self, txn: TransactionId, table: &str, key: &str) -> AppResult<()> {
        if !self.visible(txn, table, key) {
            return Err(AppError::not_found(format!(
                "no row '{key}' in table '{table}' to delete"
            )));
        }

        self.open_mut(txn)?.log.push(Write::Delete {
            table: table.to_string(),
            key: key.to_string(),
        });
        Ok(())
    }

    fn commit(&mut self, txn: TransactionId) -> AppResult<()> {
        self.open_mut(txn)?;

        if let Some(reason) = self.fail_next_commit.take() {
            warn!(transaction = %txn, reason = %reason, "Injected commit failure");
            return Err(AppError::commit(format!("commit of {txn} failed: {reason}")));
        }

        let Some(open) = self.open.take() else {
            return Err(AppError::transaction(format!("transaction {txn} is not open")));
        };
        let writes = open.log.len();

        for write in open.log {
            match write {
                Write::Upsert { table, key, row } => {
                    self.tables.entry(table).or_default().insert(key, row);
                }
                Write::Delete { table, key } => {
                    if let Some(rows) = self.tables.get_mut(&table) {
                        rows.remove(&key);
                    }
                }
            }
        }

        self.commit_count += 1;
        self.last_commit_at = Some(Utc::now());
        info!(transaction = %txn, writes, "Transaction committed");
        Ok(())
    }

    fn rollback(&mut self, txn: TransactionId) -> AppResult<()> {
        let discarded = self.open_mut(txn)?.log.len();
        self.open = None;
        info!(transaction = %txn, discarded, "Transaction rolled back");
        Ok(())
    }
}
