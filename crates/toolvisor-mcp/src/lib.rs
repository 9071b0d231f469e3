//! Tool-server registry and process supervision for toolvisor.
//!
//! [`McpService`] is the entry point: registry operations go to the
//! configuration store, lifecycle operations go through [`McpManager`],
//! which owns the processes this instance launched.

#![deny(unsafe_code)]

pub mod bulk;
mod defaults;
pub mod manager;
pub mod path;
pub mod provision;
pub mod service;

pub use bulk::{BulkStartReport, BulkStopReport, StartFailure, StopFailure};
pub use defaults::default_servers;
pub use manager::{McpManager, RuntimeState};
pub use provision::materialize_files;
pub use service::{McpServerInfo, McpService, RegistrySummary};
