//! Process-level error types.

use std::io;

use thiserror::Error;

/// Failures from spawning or controlling a server process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The OS refused to start the program (missing binary, permissions).
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Signalling, waiting or reaping failed.
    #[error("Process I/O error: {0}")]
    Io(#[from] io::Error),

    /// The child exited before its pid could be read.
    #[error("Spawned process has no pid")]
    MissingPid,
}
