//! Graceful process shutdown.

mod child;

pub use child::shutdown_child;
