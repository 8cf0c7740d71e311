//! # commithooks-registry
//!
//! Per-transaction bookkeeping for commit hooks. Provides:
//!
//! - Operation records created at flush time, numbered in flush order
//! - The transaction hook registry state machine
//!   (idle → flushing → awaiting outcome → resolved → cleared)
//! - "before" dispatch inline during flush, with a re-entrancy guard
//! - Outcome replay that fires exactly one of "after"/"failed" per record

pub mod definitions;
pub mod dispatcher;
pub mod registry;

pub use definitions::{DispatchReport, FlushReport, FlushSnapshot, OperationRecord, Outcome, RegistryState};
pub use dispatcher::OutcomeDispatcher;
pub use registry::TransactionHookRegistry;
