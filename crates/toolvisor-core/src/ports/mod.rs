//! Port definitions (trait abstractions) for external systems.
//!
//! # Design Rules
//!
//! - No `sqlx` types in any signature
//! - No process or filesystem implementation details
//! - Repository traits stay minimal and CRUD-focused

pub mod event_emitter;
pub mod server_repository;
pub mod service_error;

pub use event_emitter::{AppEventEmitter, NoopEmitter};
pub use server_repository::{RepositoryError, ServerRepository};
pub use service_error::{McpErrorCategory, McpErrorInfo, ServiceError};
