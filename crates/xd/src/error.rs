//! CLI error types.

use std::path::PathBuf;

use xd_config::ConfigError;
use xd_engine::{EngineError, PackageError};
use xd_reference::ReferenceError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Reference(#[from] ReferenceError),

    #[error("{0}")]
    Package(#[from] PackageError),

    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),
}
