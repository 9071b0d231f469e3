//! Supervisor service error types.

use thiserror::Error;

use super::RepositoryError;
use crate::domain::{FieldError, ProvisionError};

/// Errors returned by registry and lifecycle operations.
///
/// Wraps store failures and adds lifecycle failure modes without leaking
/// OS process or SQL errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No server with this id.
    #[error("Server not found: {0}")]
    NotFound(String),

    /// `add` was given an id that already exists.
    #[error("Server already exists: {0}")]
    DuplicateId(String),

    /// A field failed validation.
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// Start requested for a disabled server.
    #[error("Server is disabled: {0}")]
    Disabled(String),

    /// Start requested while this instance already supervises the server.
    #[error("Server already running: {0}")]
    AlreadyRunning(String),

    /// Stop requested while this instance does not supervise the server.
    #[error("Server not running: {0}")]
    AlreadyStopped(String),

    /// Spawn failed, or the process exited within the start grace delay.
    #[error("Failed to start server {server_id}: {message}")]
    LaunchFailed {
        server_id: String,
        message: String,
        /// Captured standard error of the failed process (may be empty).
        stderr: String,
    },

    /// Auxiliary files could not be materialized.
    #[error("File provisioning failed: {0}")]
    PathValidation(#[from] ProvisionError),

    /// Configuration store failure.
    #[error("Store error: {0}")]
    Store(String),
}

impl ServiceError {
    /// Stable snake_case code for adapters.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::DuplicateId(_) => "duplicate_id",
            Self::InvalidField { .. } => "invalid_field",
            Self::Disabled(_) => "disabled",
            Self::AlreadyRunning(_) => "already_running",
            Self::AlreadyStopped(_) => "already_stopped",
            Self::LaunchFailed { .. } => "launch_failed",
            Self::PathValidation(_) => "path_validation",
            Self::Store(_) => "store",
        }
    }

    /// The operation is not valid in the server's current state.
    pub const fn is_invalid_state(&self) -> bool {
        matches!(
            self,
            Self::Disabled(_) | Self::AlreadyRunning(_) | Self::AlreadyStopped(_)
        )
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => Self::NotFound(id),
            RepositoryError::Conflict(id) => Self::DuplicateId(id),
            RepositoryError::Internal(msg) => Self::Store(msg),
        }
    }
}

impl From<FieldError> for ServiceError {
    fn from(err: FieldError) -> Self {
        Self::InvalidField {
            field: err.field.to_string(),
            reason: err.reason,
        }
    }
}

/// User-safe error information for event payloads.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpErrorInfo {
    /// Id of the server (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,

    /// Name of the server.
    pub server_name: String,

    /// User-friendly error message.
    pub message: String,

    /// Error category.
    pub category: McpErrorCategory,
}

/// Categories of supervisor errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McpErrorCategory {
    /// Process lifecycle error.
    Process,
    /// Configuration or validation error.
    Configuration,
    /// Store or unknown error.
    Unknown,
}

impl McpErrorInfo {
    /// Build error info from a service error, categorized by variant.
    pub fn from_error(
        server_id: Option<String>,
        server_name: impl Into<String>,
        error: &ServiceError,
    ) -> Self {
        Self {
            server_id,
            server_name: server_name.into(),
            message: error.to_string(),
            category: McpErrorCategory::from(error),
        }
    }
}

impl From<&ServiceError> for McpErrorCategory {
    fn from(error: &ServiceError) -> Self {
        match error {
            ServiceError::Store(_) | ServiceError::NotFound(_) => Self::Unknown,
            ServiceError::Disabled(_)
            | ServiceError::AlreadyRunning(_)
            | ServiceError::AlreadyStopped(_)
            | ServiceError::LaunchFailed { .. } => Self::Process,
            ServiceError::DuplicateId(_)
            | ServiceError::InvalidField { .. }
            | ServiceError::PathValidation(_) => Self::Configuration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_map_to_service_errors() {
        let err: ServiceError = RepositoryError::Conflict("git-1".into()).into();
        assert_eq!(err.kind(), "duplicate_id");

        let err: ServiceError = RepositoryError::NotFound("git-1".into()).into();
        assert_eq!(err.kind(), "not_found");

        let err: ServiceError = RepositoryError::Internal("disk full".into()).into();
        assert_eq!(err.kind(), "store");
    }

    #[test]
    fn test_invalid_state_family() {
        assert!(ServiceError::Disabled("a".into()).is_invalid_state());
        assert!(ServiceError::AlreadyRunning("a".into()).is_invalid_state());
        assert!(ServiceError::AlreadyStopped("a".into()).is_invalid_state());
        assert!(!ServiceError::NotFound("a".into()).is_invalid_state());
    }

    #[test]
    fn test_error_info_serializes_camel_case() {
        let error = ServiceError::LaunchFailed {
            server_id: "git-1".into(),
            message: "exited with status 1".into(),
            stderr: String::new(),
        };
        let info = McpErrorInfo::from_error(Some("git-1".into()), "Git", &error);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["serverId"], "git-1");
        assert_eq!(json["serverName"], "Git");
        assert_eq!(json["category"], "process");
    }
}
