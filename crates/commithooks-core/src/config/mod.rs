//! Configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Every field carries a serde default, so an absent file
//! yields a usable configuration.

pub mod hooks;
pub mod logging;

use std::path::Path;

use serde::{Deserialize, Serialize};

use self::hooks::HookConfig;
use self::logging::LoggingConfig;

use crate::error::AppError;

/// Root configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// files (default.toml + environment overlay + `COMMITHOOKS__*` variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hook dispatch behavior.
    #[serde(default)]
    pub hooks: HookConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from the `config/` directory.
    ///
    /// Merges `config/default.toml` with `config/{env}.toml` and environment
    /// variables prefixed with `COMMITHOOKS__`. Missing files are skipped.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("COMMITHOOKS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        tracing::debug!(
            env,
            flush_on_commit = config.hooks.flush_on_commit,
            replay_failed_after_flush_error = config.hooks.replay_failed_after_flush_error,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load configuration from a single explicit file. The format is
    /// inferred from the extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let config = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .build()
            .map_err(|e| {
                AppError::configuration(format!(
                    "Failed to read config '{}': {e}",
                    path.display()
                ))
            })?;

        Ok(config.try_deserialize()?)
    }
}
