//! Supervisor settings and store selection.
//!
//! Settings come from `TOOLVISOR_*` environment variables. Adapters may load
//! a `.env` file first; this module only reads through a lookup function so
//! tests never have to mutate the process environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DEFAULT_HEALTH_CHECK_INTERVAL_SECS;
use crate::paths::{PathError, database_path, registry_file_path};

/// Default wait after spawn before liveness is confirmed.
pub const DEFAULT_START_GRACE_MS: u64 = 1_000;

/// Default wait between SIGTERM and SIGKILL.
pub const DEFAULT_STOP_GRACE_MS: u64 = 5_000;

/// Default pause between the stop and start halves of a restart.
pub const DEFAULT_RESTART_DELAY_MS: u64 = 1_000;

pub const ENV_START_GRACE_MS: &str = "TOOLVISOR_START_GRACE_MS";
pub const ENV_STOP_GRACE_MS: &str = "TOOLVISOR_STOP_GRACE_MS";
pub const ENV_RESTART_DELAY_MS: &str = "TOOLVISOR_RESTART_DELAY_MS";
pub const ENV_HEALTH_INTERVAL_SECS: &str = "TOOLVISOR_HEALTH_INTERVAL_SECS";
pub const ENV_STORE: &str = "TOOLVISOR_STORE";
pub const ENV_STORE_PATH: &str = "TOOLVISOR_STORE_PATH";

const MAX_START_GRACE_MS: u64 = 60_000;
const MAX_STOP_GRACE_MS: u64 = 600_000;

/// Which configuration store backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process-local, lost on exit.
    Memory,
    /// JSON document on disk.
    #[default]
    File,
    /// `SQLite` database.
    Sqlite,
}

impl StoreKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" | "json" => Ok(Self::File),
            "sqlite" | "db" => Ok(Self::Sqlite),
            other => Err(SettingsError::UnknownStore(other.to_string())),
        }
    }
}

/// Store selection plus an optional explicit location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Overrides the default location under the data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    pub const fn memory() -> Self {
        Self {
            kind: StoreKind::Memory,
            path: None,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: StoreKind::File,
            path: Some(path.into()),
        }
    }

    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: StoreKind::Sqlite,
            path: Some(path.into()),
        }
    }

    /// Location of the backing file, falling back to the data directory.
    ///
    /// Returns `None` for the memory backend.
    pub fn resolved_path(&self) -> Result<Option<PathBuf>, PathError> {
        if let Some(ref path) = self.path {
            if self.kind != StoreKind::Memory {
                return Ok(Some(path.clone()));
            }
        }
        match self.kind {
            StoreKind::Memory => Ok(None),
            StoreKind::File => registry_file_path().map(Some),
            StoreKind::Sqlite => database_path().map(Some),
        }
    }
}

/// Timing and store settings for a supervisor instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// Wait after spawn before a process counts as started.
    pub start_grace: Duration,
    /// Wait after SIGTERM before SIGKILL.
    pub stop_grace: Duration,
    /// Pause between stop and start during restart.
    pub restart_delay: Duration,
    /// Interval given to servers that do not declare one.
    pub default_health_check_interval_secs: u64,
    pub store: StoreConfig,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            start_grace: Duration::from_millis(DEFAULT_START_GRACE_MS),
            stop_grace: Duration::from_millis(DEFAULT_STOP_GRACE_MS),
            restart_delay: Duration::from_millis(DEFAULT_RESTART_DELAY_MS),
            default_health_check_interval_secs: DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
            store: StoreConfig::default(),
        }
    }
}

impl SupervisorSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, using defaults for missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(ms) = parse_u64(&lookup, ENV_START_GRACE_MS)? {
            settings.start_grace = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(&lookup, ENV_STOP_GRACE_MS)? {
            settings.stop_grace = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(&lookup, ENV_RESTART_DELAY_MS)? {
            settings.restart_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_u64(&lookup, ENV_HEALTH_INTERVAL_SECS)? {
            settings.default_health_check_interval_secs = secs;
        }
        if let Some(kind) = lookup(ENV_STORE).filter(|v| !v.trim().is_empty()) {
            settings.store.kind = kind.parse()?;
        }
        if let Some(path) = lookup(ENV_STORE_PATH).filter(|v| !v.trim().is_empty()) {
            settings.store.path = Some(PathBuf::from(path));
        }

        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Settings tuned for tests: short grace periods and an in-memory store.
    pub const fn for_tests() -> Self {
        Self {
            start_grace: Duration::from_millis(200),
            stop_grace: Duration::from_millis(2_000),
            restart_delay: Duration::from_millis(50),
            default_health_check_interval_secs: 1,
            store: StoreConfig::memory(),
        }
    }
}

fn parse_u64<F>(lookup: &F, key: &'static str) -> Result<Option<u64>, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| SettingsError::InvalidNumber { key, value: raw }),
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("Unknown store backend {0:?} (expected memory, file or sqlite)")]
    UnknownStore(String),

    #[error("Start grace must be at most 60000 ms, got {0}")]
    StartGraceTooLong(u128),

    #[error("Stop grace must be between 1 and 600000 ms, got {0}")]
    InvalidStopGrace(u128),

    #[error("Default health-check interval must be greater than zero")]
    ZeroHealthInterval,
}

/// Validate settings values.
pub fn validate_settings(settings: &SupervisorSettings) -> Result<(), SettingsError> {
    let start_ms = settings.start_grace.as_millis();
    if start_ms > u128::from(MAX_START_GRACE_MS) {
        return Err(SettingsError::StartGraceTooLong(start_ms));
    }

    let stop_ms = settings.stop_grace.as_millis();
    if stop_ms == 0 || stop_ms > u128::from(MAX_STOP_GRACE_MS) {
        return Err(SettingsError::InvalidStopGrace(stop_ms));
    }

    if settings.default_health_check_interval_secs == 0 {
        return Err(SettingsError::ZeroHealthInterval);
    }

    Ok(())
}
