//! Configuration store backends.
//!
//! All three implement `ServerRepository` with the same ordering and
//! filtering semantics. The `SqlitePool` never leaves `sqlite_repository`.

mod json_file_repository;
mod memory_repository;
mod sqlite_repository;

pub use json_file_repository::JsonFileServerRepository;
pub use memory_repository::MemoryServerRepository;
pub use sqlite_repository::SqliteServerRepository;

use toolvisor_core::domain::ServerDefinition;

/// Listing order shared by the non-SQL backends: creation time, then id.
fn sort_for_listing(servers: &mut [ServerDefinition]) {
    servers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}
