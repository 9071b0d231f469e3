//! Tool-server domain types.
//!
//! `ServerDefinition` is the persisted record, `NewServer` the add payload and
//! `ServerPatch` the closed set of fields a caller may overwrite later.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::files::{AuxiliaryFile, validate_files};

/// Default seconds between two liveness checks of a running server.
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 30;

/// Lifecycle status of a tool server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// Not running (initial and terminal state)
    #[default]
    Stopped,
    /// Process launched, liveness not yet confirmed
    Starting,
    /// Process alive and supervised
    Running,
    /// Launch failed or the process died on its own
    Error,
}

impl ServerStatus {
    /// Wire/storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stopped" => Ok(Self::Stopped),
            "starting" => Ok(Self::Starting),
            "running" => Ok(Self::Running),
            "error" => Ok(Self::Error),
            other => Err(format!("Unknown server status: {other}")),
        }
    }
}

/// A field that failed validation, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Name of the offending field as it appears on the wire.
    pub field: &'static str,
    /// Why the value was rejected.
    pub reason: String,
}

impl FieldError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// A declared tool server as persisted by the configuration store.
///
/// `status`, `process_id` and `last_error` are the last values written by a
/// supervisor. They can be stale when the process is owned by another manager
/// instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDefinition {
    /// Stable identifier, immutable after creation.
    pub id: String,

    /// User-friendly name.
    pub name: String,

    /// Free-form description shown to operators.
    #[serde(default)]
    pub description: String,

    /// Executable to launch (a name resolved via PATH, or a path).
    pub command: String,

    /// Ordered arguments passed to the command.
    #[serde(default)]
    pub arguments: Vec<String>,

    /// Environment overrides applied on top of the manager's environment.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// Working directory; the manager's own directory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    /// Disabled servers can never be started.
    pub enabled: bool,

    /// Whether bulk start picks this server up.
    pub auto_start: bool,

    /// Seconds between health checks while running.
    pub health_check_interval_secs: u64,

    /// Auxiliary files materialized under the working directory before start.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<AuxiliaryFile>,

    /// Last known status.
    #[serde(default)]
    pub status: ServerStatus,

    /// Last observed OS process id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,

    /// Last launch failure or death message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    /// When the server was added.
    pub created_at: DateTime<Utc>,

    /// Last write of any kind.
    pub updated_at: DateTime<Utc>,
}

impl ServerDefinition {
    /// Build a fresh, stopped definition from an add payload.
    ///
    /// A UUID v4 id is generated when the payload carries none.
    pub fn from_new(new_server: NewServer, now: DateTime<Utc>) -> Self {
        let id = new_server
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Self {
            id,
            name: new_server.name,
            description: new_server.description,
            command: new_server.command,
            arguments: new_server.arguments,
            environment: new_server.environment,
            working_directory: new_server.working_directory,
            enabled: new_server.enabled,
            auto_start: new_server.auto_start,
            health_check_interval_secs: new_server.health_check_interval_secs,
            files: new_server.files,
            status: ServerStatus::Stopped,
            process_id: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite only the fields present in `patch`.
    pub fn apply_patch(&mut self, patch: &ServerPatch, now: DateTime<Utc>) {
        if let Some(ref name) = patch.name {
            self.name.clone_from(name);
        }
        if let Some(ref description) = patch.description {
            self.description.clone_from(description);
        }
        if let Some(ref command) = patch.command {
            self.command.clone_from(command);
        }
        if let Some(ref arguments) = patch.arguments {
            self.arguments.clone_from(arguments);
        }
        if let Some(ref environment) = patch.environment {
            self.environment.clone_from(environment);
        }
        if let Some(ref working_directory) = patch.working_directory {
            self.working_directory.clone_from(working_directory);
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(auto_start) = patch.auto_start {
            self.auto_start = auto_start;
        }
        if let Some(interval) = patch.health_check_interval_secs {
            self.health_check_interval_secs = interval;
        }
        if let Some(ref files) = patch.files {
            self.files.clone_from(files);
        }
        self.updated_at = now;
    }

    /// Record a supervisor transition.
    pub fn apply_runtime(&mut self, record: &RuntimeRecord, now: DateTime<Utc>) {
        self.status = record.status;
        self.process_id = record.process_id;
        self.last_error.clone_from(&record.last_error);
        self.updated_at = now;
    }
}

/// A tool server to be added (no id assigned yet, or a caller-chosen one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewServer {
    /// Caller-supplied id; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub command: String,

    #[serde(default)]
    pub arguments: Vec<String>,

    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub auto_start: bool,

    #[serde(default = "default_interval")]
    pub health_check_interval_secs: u64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<AuxiliaryFile>,
}

const fn default_true() -> bool {
    true
}

const fn default_interval() -> u64 {
    DEFAULT_HEALTH_CHECK_INTERVAL_SECS
}

impl NewServer {
    /// Create an enabled, auto-starting server definition.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            command: command.into(),
            arguments: Vec::new(),
            environment: BTreeMap::new(),
            working_directory: None,
            enabled: true,
            auto_start: true,
            health_check_interval_secs: DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
            files: Vec::new(),
        }
    }

    /// Use a caller-chosen id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the argument list.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add an environment override.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Set enabled status.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set auto-start.
    #[must_use]
    pub const fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Set the health-check interval in seconds.
    #[must_use]
    pub const fn with_health_check_interval(mut self, secs: u64) -> Self {
        self.health_check_interval_secs = secs;
        self
    }

    /// Declare an auxiliary file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.push(AuxiliaryFile::new(path, content));
        self
    }

    /// Check every field before the definition reaches a store.
    pub fn validate(&self) -> Result<(), FieldError> {
        if let Some(ref id) = self.id {
            validate_id(id)?;
        }
        validate_name(&self.name)?;
        validate_command(&self.command)?;
        validate_environment(&self.environment)?;
        if let Some(ref dir) = self.working_directory {
            validate_working_directory(dir)?;
        }
        validate_interval(self.health_check_interval_secs)?;
        validate_files(&self.files).map_err(|e| FieldError::new("files", e.to_string()))
    }
}

/// Partial update of a server definition.
///
/// Absent fields are left untouched. `workingDirectory` is tri-state:
/// absent = untouched, `null` = cleared, a value = set. Unknown fields
/// (including `id`, `status` and `processId`) are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<BTreeMap<String, String>>,

    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub working_directory: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_start: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_interval_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<AuxiliaryFile>>,
}

/// Distinguishes an explicit `null` from an absent field.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl ServerPatch {
    /// True when the patch would change nothing but the timestamp.
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.command.is_none()
            && self.arguments.is_none()
            && self.environment.is_none()
            && self.working_directory.is_none()
            && self.enabled.is_none()
            && self.auto_start.is_none()
            && self.health_check_interval_secs.is_none()
            && self.files.is_none()
    }

    /// Validate the fields that are present.
    pub fn validate(&self) -> Result<(), FieldError> {
        if let Some(ref name) = self.name {
            validate_name(name)?;
        }
        if let Some(ref command) = self.command {
            validate_command(command)?;
        }
        if let Some(ref environment) = self.environment {
            validate_environment(environment)?;
        }
        if let Some(Some(ref dir)) = self.working_directory {
            validate_working_directory(dir)?;
        }
        if let Some(interval) = self.health_check_interval_secs {
            validate_interval(interval)?;
        }
        if let Some(ref files) = self.files {
            validate_files(files).map_err(|e| FieldError::new("files", e.to_string()))?;
        }
        Ok(())
    }
}

/// Status write performed by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeRecord {
    pub status: ServerStatus,
    pub process_id: Option<u32>,
    pub last_error: Option<String>,
}

impl RuntimeRecord {
    /// Launch in progress.
    pub const fn starting() -> Self {
        Self {
            status: ServerStatus::Starting,
            process_id: None,
            last_error: None,
        }
    }

    /// Liveness confirmed.
    pub const fn running(pid: u32) -> Self {
        Self {
            status: ServerStatus::Running,
            process_id: Some(pid),
            last_error: None,
        }
    }

    /// Intentionally stopped.
    pub const fn stopped() -> Self {
        Self {
            status: ServerStatus::Stopped,
            process_id: None,
            last_error: None,
        }
    }

    /// Launch failure or external death.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ServerStatus::Error,
            process_id: None,
            last_error: Some(message.into()),
        }
    }
}

/// Filter applied to list operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ServerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl ServerFilter {
    /// Filter on status only.
    pub const fn with_status(status: ServerStatus) -> Self {
        Self {
            status: Some(status),
            enabled: None,
        }
    }

    /// Filter on the enabled flag only.
    pub const fn with_enabled(enabled: bool) -> Self {
        Self {
            status: None,
            enabled: Some(enabled),
        }
    }

    /// Whether a server with this status and flag passes the filter.
    pub fn matches(&self, status: ServerStatus, enabled: bool) -> bool {
        self.status.is_none_or(|s| s == status) && self.enabled.is_none_or(|e| e == enabled)
    }
}

fn validate_id(id: &str) -> Result<(), FieldError> {
    if id.trim().is_empty() {
        return Err(FieldError::new("id", "Server id cannot be empty"));
    }
    if id.contains(char::is_whitespace) {
        return Err(FieldError::new("id", "Server id cannot contain whitespace"));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), FieldError> {
    if name.trim().is_empty() {
        return Err(FieldError::new("name", "Server name cannot be empty"));
    }
    Ok(())
}

fn validate_command(command: &str) -> Result<(), FieldError> {
    if command.trim().is_empty() {
        return Err(FieldError::new("command", "Command cannot be empty"));
    }
    if command.contains(char::is_whitespace) {
        return Err(FieldError::new(
            "command",
            "Command must be an executable name/path only (e.g., 'npx'). \
             Put flags and arguments in the 'arguments' field.",
        ));
    }
    Ok(())
}

fn validate_environment(environment: &BTreeMap<String, String>) -> Result<(), FieldError> {
    for key in environment.keys() {
        if key.is_empty() {
            return Err(FieldError::new(
                "environment",
                "Environment variable name cannot be empty",
            ));
        }
        if key.contains('=') || key.contains('\0') {
            return Err(FieldError::new(
                "environment",
                format!("Invalid environment variable name: {key}"),
            ));
        }
    }
    Ok(())
}

fn validate_working_directory(dir: &str) -> Result<(), FieldError> {
    if !std::path::Path::new(dir).is_absolute() {
        return Err(FieldError::new(
            "working_directory",
            format!("Working directory must be absolute: {dir}"),
        ));
    }
    Ok(())
}

fn validate_interval(secs: u64) -> Result<(), FieldError> {
    if secs == 0 {
        return Err(FieldError::new(
            "health_check_interval_secs",
            "Health-check interval must be greater than zero",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_server_defaults_from_json() {
        let server: NewServer =
            serde_json::from_str(r#"{"name": "Git", "command": "npx"}"#).unwrap();

        assert!(server.enabled);
        assert!(server.auto_start);
        assert_eq!(server.health_check_interval_secs, 30);
        assert!(server.arguments.is_empty());
        assert!(server.id.is_none());
    }

    #[test]
    fn test_new_server_rejects_unknown_fields() {
        let result = serde_json::from_str::<NewServer>(
            r#"{"name": "Git", "command": "npx", "status": "running"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_patch_rejects_id_field() {
        let result = serde_json::from_str::<ServerPatch>(r#"{"id": "other"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_patch_working_directory_tri_state() {
        let absent: ServerPatch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.working_directory, None);
        assert!(absent.is_empty());

        let cleared: ServerPatch =
            serde_json::from_str(r#"{"workingDirectory": null}"#).unwrap();
        assert_eq!(cleared.working_directory, Some(None));

        let set: ServerPatch =
            serde_json::from_str(r#"{"workingDirectory": "/srv/tools"}"#).unwrap();
        assert_eq!(set.working_directory, Some(Some("/srv/tools".to_string())));
    }

    #[test]
    fn test_definition_wire_form_is_camel_case() {
        let def = ServerDefinition::from_new(
            NewServer::new("Git", "npx").with_id("git-1").with_working_dir("/srv/git"),
            Utc::now(),
        );
        let json = serde_json::to_value(&def).unwrap();

        assert_eq!(json["workingDirectory"], "/srv/git");
        assert_eq!(json["autoStart"], true);
        assert_eq!(json["healthCheckIntervalSecs"], 30);
        assert!(json.get("working_directory").is_none());

        let patch = serde_json::from_str::<ServerPatch>(r#"{"auto_start": false}"#);
        assert!(patch.is_err());
    }

    #[test]
    fn test_from_new_generates_id() {
        let def = ServerDefinition::from_new(NewServer::new("A", "cat"), Utc::now());
        assert!(uuid::Uuid::parse_str(&def.id).is_ok());
        assert_eq!(def.status, ServerStatus::Stopped);
        assert_eq!(def.process_id, None);
    }

    #[test]
    fn test_apply_patch_only_touches_present_fields() {
        let created = Utc::now();
        let mut def = ServerDefinition::from_new(
            NewServer::new("Files", "python")
                .with_id("filesystem-1")
                .with_args(["server.py"])
                .with_working_dir("/srv/files"),
            created,
        );

        let patch = ServerPatch {
            description: Some("Local files".to_string()),
            working_directory: Some(None),
            ..Default::default()
        };
        let later = created + chrono::Duration::seconds(5);
        def.apply_patch(&patch, later);

        assert_eq!(def.name, "Files");
        assert_eq!(def.arguments, vec!["server.py".to_string()]);
        assert_eq!(def.description, "Local files");
        assert_eq!(def.working_directory, None);
        assert_eq!(def.updated_at, later);
        assert_eq!(def.created_at, created);
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let err = NewServer::new("", "cat").validate().unwrap_err();
        assert_eq!(err.field, "name");

        let err = NewServer::new("A", "npx -y server").validate().unwrap_err();
        assert_eq!(err.field, "command");

        let err = NewServer::new("A", "cat")
            .with_health_check_interval(0)
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "health_check_interval_secs");

        let err = NewServer::new("A", "cat")
            .with_working_dir("relative/dir")
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "working_directory");

        let err = NewServer::new("A", "cat")
            .with_file("../escape.txt", "x")
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "files");
    }

    #[test]
    fn test_filter_matches() {
        let filter = ServerFilter {
            status: Some(ServerStatus::Running),
            enabled: Some(true),
        };
        assert!(filter.matches(ServerStatus::Running, true));
        assert!(!filter.matches(ServerStatus::Stopped, true));
        assert!(!filter.matches(ServerStatus::Running, false));
        assert!(ServerFilter::default().matches(ServerStatus::Error, false));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            ServerStatus::Stopped,
            ServerStatus::Starting,
            ServerStatus::Running,
            ServerStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<ServerStatus>().unwrap(), status);
        }
        assert!("paused".parse::<ServerStatus>().is_err());
    }
}
