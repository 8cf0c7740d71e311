//! Convenience result type alias for commithooks.

use crate::error::AppError;

/// A specialized `Result` type for commithooks operations.
///
/// Hook callbacks, registry transitions, and engine calls all return this,
/// so a callback failure travels back through `?` untouched.
pub type AppResult<T> = Result<T, AppError>;
