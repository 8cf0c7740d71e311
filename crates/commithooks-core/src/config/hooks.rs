//! Hook dispatch configuration.

use serde::{Deserialize, Serialize};

/// Controls how a session drives the hook registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookConfig {
    /// Flush pending changes as the first step of `commit()`, so every
    /// entity touched in the transaction has its "before" hook fired before
    /// the commit is attempted.
    #[serde(default = "default_true")]
    pub flush_on_commit: bool,
    /// After a "before" hook fails during flush, replay "failed" hooks for
    /// the records already queued when the transaction is rolled back. When
    /// disabled those records are discarded with a warning. A flush that
    /// fails on an engine write always replays "failed".
    #[serde(default = "default_true")]
    pub replay_failed_after_flush_error: bool,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            flush_on_commit: true,
            replay_failed_after_flush_error: true,
        }
    }
}

fn default_true() -> bool {
    true
}
