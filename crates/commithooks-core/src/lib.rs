//! # commithooks-core
//!
//! Core crate for commithooks. Contains the hookable entity contract,
//! the persistence collaborator traits, configuration schemas, typed
//! identifiers, and the unified error system.
//!
//! This crate has **no** internal dependencies on other commithooks crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
pub use traits::{AsAny, CommitHooks, EntityResolver, Model, PersistenceEngine};
pub use types::{EntityKey, HookPhase, HookPoint, HookSet, OperationKind, Sequence, TransactionId};
