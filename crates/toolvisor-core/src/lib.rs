//! Core domain types, ports and configuration for toolvisor.
//!
//! Everything here is infrastructure-free: no process spawning, no SQL.
//! Adapters (`toolvisor-db`, `toolvisor-runtime`, `toolvisor-mcp`) depend on
//! this crate, never the other way round.

#![deny(unsafe_code)]

pub mod domain;
pub mod events;
pub mod paths;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    AuxiliaryFile, DEFAULT_HEALTH_CHECK_INTERVAL_SECS, FieldError, MAX_FILE_BYTES,
    MAX_FILES_PER_SERVER, NewServer, ProvisionError, RuntimeRecord, ServerDefinition,
    ServerFilter, ServerPatch, ServerStatus, validate_files, validate_relative_path,
};
pub use events::{AppEvent, ServerSummary};
pub use ports::{
    AppEventEmitter, McpErrorCategory, McpErrorInfo, NoopEmitter, RepositoryError,
    ServerRepository, ServiceError,
};
pub use settings::{
    SettingsError, StoreConfig, StoreKind, SupervisorSettings, validate_settings,
};

// Re-export path utilities
pub use paths::{PathError, current_dir, data_root, database_path, registry_file_path};
