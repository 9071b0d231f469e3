//! Working-directory resolution and validation for tool-server launches.
//!
//! This module provides utilities to:
//! - Pick the directory a server runs from (declared, or the manager's own)
//! - Validate that the directory exists before spawning into it
//! - Check commands given as explicit paths

use std::path::{Path, PathBuf};

use toolvisor_core::ServerDefinition;

/// Directory a server is launched from.
///
/// The declared working directory if set and non-empty, otherwise the
/// manager's current directory.
pub fn resolve_working_dir(server: &ServerDefinition) -> Result<PathBuf, String> {
    match server.working_directory.as_deref() {
        Some(dir) if !dir.trim().is_empty() => Ok(PathBuf::from(dir)),
        _ => toolvisor_core::current_dir().map_err(|e| e.to_string()),
    }
}

/// Validate a working directory.
///
/// Returns Ok(()) if the directory exists and is actually a directory.
pub fn validate_working_dir(cwd: &Path) -> Result<(), String> {
    if !cwd.exists() {
        return Err(format!(
            "Working directory does not exist: {}",
            cwd.display()
        ));
    }

    if !cwd.is_dir() {
        return Err(format!(
            "Working directory path is not a directory: {}",
            cwd.display()
        ));
    }

    Ok(())
}

/// Validate a command that names an explicit path (`./run.sh`, `/usr/bin/env`).
///
/// Bare names are left to the OS `PATH` lookup at spawn time. Relative paths
/// are checked against `working_dir`, matching how the child resolves them.
pub fn validate_command_path(command: &str, working_dir: &Path) -> Result<(), String> {
    if !command.contains(std::path::MAIN_SEPARATOR) && !command.contains('/') {
        return Ok(());
    }

    let path = Path::new(command);
    let full = if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    };

    if !full.exists() {
        return Err(format!("Executable not found: {command}"));
    }
    if !full.is_file() {
        return Err(format!("Executable path is not a file: {command}"));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(&full) {
            Ok(metadata) => {
                if metadata.permissions().mode() & 0o111 == 0 {
                    return Err(format!("File is not executable: {command}"));
                }
            }
            Err(e) => return Err(format!("Failed to check permissions: {e}")),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use toolvisor_core::NewServer;

    #[test]
    fn test_declared_working_dir_wins() {
        let server =
            ServerDefinition::from_new(NewServer::new("a", "cat").with_working_dir("/srv/a"), Utc::now());
        assert_eq!(resolve_working_dir(&server).unwrap(), PathBuf::from("/srv/a"));
    }

    #[test]
    fn test_missing_working_dir_falls_back_to_current() {
        let server = ServerDefinition::from_new(NewServer::new("a", "cat"), Utc::now());
        assert_eq!(
            resolve_working_dir(&server).unwrap(),
            std::env::current_dir().unwrap()
        );
    }

    #[test]
    fn test_validate_working_dir() {
        let temp = tempfile::tempdir().unwrap();
        assert!(validate_working_dir(temp.path()).is_ok());

        let missing = temp.path().join("nope");
        let err = validate_working_dir(&missing).unwrap_err();
        assert!(err.contains("does not exist"));

        let file = temp.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        let err = validate_working_dir(&file).unwrap_err();
        assert!(err.contains("not a directory"));
    }

    #[test]
    fn test_bare_command_is_not_checked() {
        assert!(validate_command_path("npx", Path::new("/nonexistent")).is_ok());
    }

    #[test]
    #[cfg(unix)]
    fn test_command_path_checks() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let script = temp.path().join("run.sh");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();

        let err = validate_command_path("./run.sh", temp.path()).unwrap_err();
        assert!(err.contains("not executable"));

        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(validate_command_path("./run.sh", temp.path()).is_ok());
        assert!(validate_command_path(script.to_str().unwrap(), Path::new("/")).is_ok());

        let err = validate_command_path("./missing.sh", temp.path()).unwrap_err();
        assert!(err.contains("not found"));
    }
}
