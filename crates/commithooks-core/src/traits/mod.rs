//! Core traits defined in `commithooks-core` and implemented by entities,
//! sessions, and engines.

pub mod engine;
pub mod hooks;
pub mod model;
pub mod resolver;

pub use engine::PersistenceEngine;
pub use hooks::{CommitHooks, invoke};
pub use model::{AsAny, AsCommitHooks, Model};
pub use resolver::EntityResolver;
