//! Process runtime for toolvisor.
//!
//! Owns every OS-level concern of supervision: building and spawning the
//! child, draining its stdio, SIGTERM/SIGKILL shutdown and liveness checks.
//! Nothing here touches the configuration store.

#![deny(unsafe_code)]

pub mod health_monitor;
pub mod process;

pub use health_monitor::{ProcessHealth, ProcessHealthMonitor};
pub use process::{
    LaunchSpec, ProcessError, STDERR_TAIL_BYTES, StderrTail, SupervisedProcess, describe_exit,
    shutdown_child, spawn,
};
