//! Core type definitions used across the commithooks workspace.

pub mod hook;
pub mod id;

pub use hook::{HookPhase, HookPoint, HookSet, OperationKind};
pub use id::{EntityKey, Sequence, TransactionId};
