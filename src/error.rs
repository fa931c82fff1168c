/// Error types for the decode → record → launch pipeline
///
/// Each layer has its own enum so callers can tell a bad archive from a bad
/// command template. Every variant carries enough text to be shown to the
/// user as-is.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Failures while turning an Office document into a decoded folder
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode file: {0}")]
    ExtractionFailed(String),
}

/// Failures while running a resolved open command
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Command failed: {0}")]
    ExecutionFailed(String),
}

/// Failures of the command store, the recent-files ledger and their persistence
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid command: {0}")]
    Validation(String),

    #[error("No command with id {0}")]
    UnknownCommand(Uuid),

    #[error("No recent file with id {0}")]
    UnknownRecentFile(Uuid),

    #[error("Settings storage error: {0}")]
    Persistence(String),

    #[error("Failed to encode settings: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Persistence(err.to_string())
    }
}

/// Top-level error for the application shell
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No command configured. Add one with `officeviewer commands add`.")]
    NoDefaultCommand,
}
