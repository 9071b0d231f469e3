//! Materialization of auxiliary files under a server's working directory.

use std::path::{Path, PathBuf};

use tokio::fs;
use toolvisor_core::{AuxiliaryFile, ProvisionError, validate_files, validate_relative_path};
use tracing::debug;

fn io_error(path: &Path, err: &std::io::Error) -> ProvisionError {
    ProvisionError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Write `files` under `root`, creating `root` and parent directories.
///
/// Paths are validated lexically first. After parent directories exist,
/// the canonical parent must still lie inside the canonical root, so a
/// symlinked directory cannot redirect a write elsewhere. Returns the
/// written paths.
pub async fn materialize_files(
    root: &Path,
    files: &[AuxiliaryFile],
) -> Result<Vec<PathBuf>, ProvisionError> {
    validate_files(files)?;
    if files.is_empty() {
        return Ok(Vec::new());
    }

    fs::create_dir_all(root)
        .await
        .map_err(|e| io_error(root, &e))?;
    let canonical_root = fs::canonicalize(root)
        .await
        .map_err(|e| io_error(root, &e))?;

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let relative = validate_relative_path(&file.path)?;
        let target = canonical_root.join(&relative);
        let Some(file_name) = target.file_name().map(ToOwned::to_owned) else {
            return Err(ProvisionError::EmptyPath);
        };
        let parent = target
            .parent()
            .map_or_else(|| canonical_root.clone(), Path::to_path_buf);

        fs::create_dir_all(&parent)
            .await
            .map_err(|e| io_error(&parent, &e))?;
        let canonical_parent = fs::canonicalize(&parent)
            .await
            .map_err(|e| io_error(&parent, &e))?;
        if !canonical_parent.starts_with(&canonical_root) {
            return Err(ProvisionError::EscapesRoot(file.path.clone()));
        }

        let destination = canonical_parent.join(file_name);
        if let Ok(meta) = fs::symlink_metadata(&destination).await {
            if meta.file_type().is_symlink() {
                return Err(ProvisionError::EscapesRoot(file.path.clone()));
            }
        }

        fs::write(&destination, file.content.as_bytes())
            .await
            .map_err(|e| io_error(&destination, &e))?;
        debug!(path = %destination.display(), bytes = file.content.len(), "Provisioned file");
        written.push(destination);
    }

    Ok(written)
}
