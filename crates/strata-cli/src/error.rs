// crates/strata-cli/src/error.rs
// ============================================================================
// Module: CLI Errors
// Description: Failures surfaced by `strata` commands.
// Purpose: Give every command one error type with readable messages.
// Dependencies: strata-config, strata-core, thiserror
// ============================================================================

use strata_config::ConfigError;
use strata_core::RegistryError;
use strata_core::StoreError;
use thiserror::Error;

/// Command failure.
#[derive(Debug, Error)]
pub enum CliError {
    /// Job file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Store could not be opened or queried.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Built-in components could not be registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Subscriber installation failed.
    #[error("logging setup failed: {0}")]
    Logging(String),
    /// Writing a report failed.
    #[error("output failed: {0}")]
    Output(String),
}

/// Result alias for commands.
pub type CliResult<T> = Result<T, CliError>;
