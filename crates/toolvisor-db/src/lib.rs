//! Configuration store backends for toolvisor.
//!
//! - [`MemoryServerRepository`]: process-local, for tests and ephemeral runs
//! - [`JsonFileServerRepository`]: a single JSON document rewritten atomically
//! - [`SqliteServerRepository`]: `sqlx` over `SQLite`
//!
//! [`open_repository`] picks one from a `StoreConfig`.

#![deny(unsafe_code)]

pub mod factory;
pub mod repositories;
pub mod setup;

pub use factory::open_repository;

pub use repositories::{JsonFileServerRepository, MemoryServerRepository, SqliteServerRepository};

pub use setup::setup_database;
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;
