//! Server configuration store trait and error types.
//!
//! This module defines the persistence abstraction for tool-server
//! definitions. Backends live in `toolvisor-db`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{RuntimeRecord, ServerDefinition, ServerFilter, ServerPatch};

/// Domain-specific errors for configuration store operations.
///
/// Abstracts away storage details so services can handle failures uniformly.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested server was not found.
    #[error("Server not found: {0}")]
    NotFound(String),

    /// A server with the same id already exists.
    #[error("Server already exists: {0}")]
    Conflict(String),

    /// Storage backend error (database, filesystem, serialization).
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Repository trait for tool-server persistence.
///
/// # Design Rules
///
/// - Every operation is atomic with respect to concurrent callers
/// - `update()` only touches configuration fields, never runtime state
/// - `update_status()` only touches runtime state, never configuration
/// - `id` is unique and immutable
///
/// # Example
///
/// ```ignore
/// let server = repo.insert(definition).await?;
/// repo.update_status(&server.id, &RuntimeRecord::running(4242)).await?;
/// let running = repo.list(&ServerFilter::with_status(ServerStatus::Running)).await?;
/// ```
#[async_trait]
pub trait ServerRepository: Send + Sync {
    /// Persist a new definition.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the id is already taken
    /// - `Internal` for storage errors
    async fn insert(&self, server: ServerDefinition)
    -> Result<ServerDefinition, RepositoryError>;

    /// Fetch one definition by id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no server has this id
    /// - `Internal` for storage errors
    async fn get(&self, id: &str) -> Result<ServerDefinition, RepositoryError>;

    /// List definitions passing `filter`, ordered by `created_at` then `id`.
    async fn list(&self, filter: &ServerFilter) -> Result<Vec<ServerDefinition>, RepositoryError>;

    /// Apply a partial configuration update and return the result.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no server has this id
    /// - `Internal` for storage errors
    async fn update(
        &self,
        id: &str,
        patch: &ServerPatch,
    ) -> Result<ServerDefinition, RepositoryError>;

    /// Record a runtime transition (status, process id, last error).
    ///
    /// # Errors
    ///
    /// - `NotFound` if no server has this id
    /// - `Internal` for storage errors
    async fn update_status(&self, id: &str, record: &RuntimeRecord)
    -> Result<(), RepositoryError>;

    /// Remove a definition. Returns whether one existed.
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;
}
