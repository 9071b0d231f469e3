//! Low-level process supervision: spawn, captured stdio, graceful shutdown.
//!
//! # Structure
//!
//! - `LaunchSpec` / `spawn` - build the command and start the child
//! - `SupervisedProcess` - owned child plus its stdio plumbing
//! - `shutdown_child` - SIGTERM → grace → SIGKILL → reap
//! - `StderrTail` - bounded capture of standard error

mod command;
mod error;
mod exit;
pub mod shutdown;
mod stream;

pub use command::{LaunchSpec, SupervisedProcess, spawn};
pub use error::ProcessError;
pub use exit::describe_exit;
pub use shutdown::shutdown_child;
pub use stream::{STDERR_TAIL_BYTES, StderrTail};
