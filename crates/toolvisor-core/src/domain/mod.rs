//! Domain types for tool-server supervision.

mod files;
mod server;

pub use files::{
    AuxiliaryFile, MAX_FILE_BYTES, MAX_FILES_PER_SERVER, ProvisionError, validate_files,
    validate_relative_path,
};
pub use server::{
    DEFAULT_HEALTH_CHECK_INTERVAL_SECS, FieldError, NewServer, RuntimeRecord, ServerDefinition,
    ServerFilter, ServerPatch, ServerStatus,
};
