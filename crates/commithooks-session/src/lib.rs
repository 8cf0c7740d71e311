//! # commithooks-session
//!
//! The hook-aware unit of work. [`HookSession`] wraps a
//! [`PersistenceEngine`](commithooks_core::PersistenceEngine), tracks
//! entities in an identity map, and turns its flush, commit, and rollback
//! into registry transitions. [`MemoryEngine`] is an in-memory engine for
//! tests and demos.

pub mod identity;
pub mod memory;
pub mod session;

pub use identity::{EntityState, IdentityMap};
pub use memory::MemoryEngine;
pub use session::HookSession;
