//! Auxiliary files declared by a server definition.
//!
//! Paths are checked lexically here. The provisioner in `toolvisor-mcp`
//! repeats the containment check against the canonical working directory
//! before anything touches the filesystem.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum size of one auxiliary file (5 MiB).
pub const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;

/// Maximum number of auxiliary files per server.
pub const MAX_FILES_PER_SERVER: usize = 20;

/// A file materialized under the server's working directory before launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxiliaryFile {
    /// Path relative to the working directory.
    pub path: String,
    /// UTF-8 content written verbatim.
    pub content: String,
}

impl AuxiliaryFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Reasons an auxiliary-file set cannot be provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    #[error("File path cannot be empty")]
    EmptyPath,

    #[error("File path must be relative: {0}")]
    AbsolutePath(String),

    #[error("File path escapes the working directory: {0}")]
    EscapesRoot(String),

    #[error("Too many files: {count} (limit {limit})")]
    TooManyFiles { count: usize, limit: usize },

    #[error("File {path} is {size} bytes (limit {limit})")]
    FileTooLarge {
        path: String,
        size: usize,
        limit: usize,
    },

    #[error("Failed to provision {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Lexically normalize a declared relative path.
///
/// `.` segments are dropped and `..` pops the previous segment. A `..` with
/// nothing left to pop escapes the root and is rejected, so `a/../b.txt`
/// is accepted as `b.txt` while `../escape.txt` is not.
pub fn validate_relative_path(raw: &str) -> Result<PathBuf, ProvisionError> {
    if raw.trim().is_empty() {
        return Err(ProvisionError::EmptyPath);
    }

    let mut normalized = PathBuf::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                return Err(ProvisionError::AbsolutePath(raw.to_string()));
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(ProvisionError::EscapesRoot(raw.to_string()));
                }
            }
            Component::Normal(segment) => normalized.push(segment),
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(ProvisionError::EmptyPath);
    }
    Ok(normalized)
}

/// Apply the count, size and path limits to a whole file set.
pub fn validate_files(files: &[AuxiliaryFile]) -> Result<(), ProvisionError> {
    if files.len() > MAX_FILES_PER_SERVER {
        return Err(ProvisionError::TooManyFiles {
            count: files.len(),
            limit: MAX_FILES_PER_SERVER,
        });
    }

    for file in files {
        validate_relative_path(&file.path)?;
        if file.content.len() > MAX_FILE_BYTES {
            return Err(ProvisionError::FileTooLarge {
                path: file.path.clone(),
                size: file.content.len(),
                limit: MAX_FILE_BYTES,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_inner_parent_segments() {
        assert_eq!(
            validate_relative_path("a/../b.txt").unwrap(),
            PathBuf::from("b.txt")
        );
        assert_eq!(
            validate_relative_path("./conf/./app.toml").unwrap(),
            PathBuf::from("conf/app.toml")
        );
    }

    #[test]
    fn test_rejects_escaping_paths() {
        assert!(matches!(
            validate_relative_path("../escape.txt"),
            Err(ProvisionError::EscapesRoot(_))
        ));
        assert!(matches!(
            validate_relative_path("a/../../escape.txt"),
            Err(ProvisionError::EscapesRoot(_))
        ));
    }

    #[test]
    fn test_rejects_absolute_and_empty_paths() {
        assert!(matches!(
            validate_relative_path("/etc/passwd"),
            Err(ProvisionError::AbsolutePath(_))
        ));
        assert_eq!(validate_relative_path(""), Err(ProvisionError::EmptyPath));
        assert_eq!(validate_relative_path("."), Err(ProvisionError::EmptyPath));
        assert_eq!(validate_relative_path("a/.."), Err(ProvisionError::EmptyPath));
    }

    #[test]
    fn test_limits() {
        let too_many: Vec<_> = (0..=MAX_FILES_PER_SERVER)
            .map(|i| AuxiliaryFile::new(format!("f{i}.txt"), ""))
            .collect();
        assert!(matches!(
            validate_files(&too_many),
            Err(ProvisionError::TooManyFiles { count: 21, limit: 20 })
        ));

        let big = vec![AuxiliaryFile::new("big.bin", "x".repeat(MAX_FILE_BYTES + 1))];
        assert!(matches!(
            validate_files(&big),
            Err(ProvisionError::FileTooLarge { .. })
        ));

        let exact = vec![AuxiliaryFile::new("ok.bin", "x".repeat(MAX_FILE_BYTES))];
        assert!(validate_files(&exact).is_ok());
    }
}
