//! Path utilities for toolvisor data directories.
//!
//! Resolution order for the data root:
//! 1. `TOOLVISOR_DATA_DIR` environment variable
//! 2. `dirs::data_local_dir()/toolvisor`

mod error;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub use error::PathError;

/// Environment variable overriding the data root.
pub const ENV_DATA_DIR: &str = "TOOLVISOR_DATA_DIR";

/// File name of the JSON registry.
pub const REGISTRY_FILE_NAME: &str = "servers.json";

/// File name of the `SQLite` database.
pub const DATABASE_FILE_NAME: &str = "toolvisor.db";

/// Root directory for toolvisor data, created if missing.
pub fn data_root() -> Result<PathBuf, PathError> {
    let root = match env::var(ENV_DATA_DIR) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => dirs::data_local_dir()
            .ok_or(PathError::NoDataDir)?
            .join("toolvisor"),
    };
    ensure_dir(&root)?;
    Ok(root)
}

/// Path to the JSON registry file.
pub fn registry_file_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join(REGISTRY_FILE_NAME))
}

/// Path to the `SQLite` database file.
pub fn database_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join(DATABASE_FILE_NAME))
}

/// The manager's current directory, used when a server declares none.
pub fn current_dir() -> Result<PathBuf, PathError> {
    env::current_dir().map_err(|e| PathError::CurrentDirError(e.to_string()))
}

fn ensure_dir(path: &Path) -> Result<(), PathError> {
    if path.is_dir() {
        return Ok(());
    }
    if path.exists() {
        return Err(PathError::NotADirectory(path.to_path_buf()));
    }
    fs::create_dir_all(path).map_err(|e| PathError::CreateFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_dir_creates_nested() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }

    #[test]
    fn test_ensure_dir_rejects_file() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("data");
        std::fs::write(&file, "").unwrap();
        assert!(matches!(ensure_dir(&file), Err(PathError::NotADirectory(_))));
    }

    #[test]
    fn test_file_names() {
        assert!(REGISTRY_FILE_NAME.ends_with(".json"));
        assert!(DATABASE_FILE_NAME.ends_with(".db"));
    }
}
