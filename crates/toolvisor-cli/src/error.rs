//! CLI-specific error types and mappings.
//!
//! Maps service errors to exit codes and user-facing messages.

use thiserror::Error;
use toolvisor_core::ServiceError;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Service error from the registry or supervisor.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Argument error the parser cannot catch (unreadable file source, ...).
    #[error("Invalid arguments: {0}")]
    Arguments(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 1: General error
    /// - 2: Misuse (invalid arguments or fields)
    /// - 64-78: Specific categories (see sysexits.h)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Arguments(_) => 2,
            Self::Service(err) => service_exit_code(err),
        }
    }
}

const fn service_exit_code(err: &ServiceError) -> i32 {
    match err {
        ServiceError::InvalidField { .. } | ServiceError::PathValidation(_) => 2,
        ServiceError::NotFound(_) => 66, // EX_NOINPUT
        ServiceError::DuplicateId(_)
        | ServiceError::Disabled(_)
        | ServiceError::AlreadyRunning(_)
        | ServiceError::AlreadyStopped(_) => 65, // EX_DATAERR
        ServiceError::LaunchFailed { .. } => 69, // EX_UNAVAILABLE
        ServiceError::Store(_) => 74,            // EX_IOERR
    }
}

/// Exit code for an error bubbling out of a handler.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(cli) = err.downcast_ref::<CliError>() {
        return cli.exit_code();
    }
    err.downcast_ref::<ServiceError>()
        .map_or(1, service_exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let not_found = anyhow::Error::new(ServiceError::NotFound("git-1".into()));
        assert_eq!(exit_code_for(&not_found), 66);

        let args = anyhow::Error::new(CliError::Arguments("bad".into()));
        assert_eq!(exit_code_for(&args), 2);

        let other = anyhow::anyhow!("boom");
        assert_eq!(exit_code_for(&other), 1);
    }

    #[test]
    fn test_invalid_state_errors_share_exit_code() {
        for err in [
            ServiceError::Disabled("a".into()),
            ServiceError::AlreadyRunning("a".into()),
            ServiceError::AlreadyStopped("a".into()),
        ] {
            assert_eq!(CliError::Service(err).exit_code(), 65);
        }
    }

    #[test]
    fn test_context_keeps_exit_code() {
        let err = anyhow::Error::new(ServiceError::Store("disk".into())).context("Failed to list");
        assert_eq!(exit_code_for(&err), 74);
    }
}
