//! Errors resolving toolvisor data locations.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    /// Neither `TOOLVISOR_DATA_DIR` nor a platform data directory is available.
    #[error("Cannot determine system data directory")]
    NoDataDir,

    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    #[error("Failed to create directory {path}: {reason}")]
    CreateFailed { path: PathBuf, reason: String },

    #[error("Cannot determine current directory: {0}")]
    CurrentDirError(String),
}
