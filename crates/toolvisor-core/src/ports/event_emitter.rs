//! Event emitter trait for supervisor notifications.
//!
//! Implementations handle transport details (channels, logs, sockets).

use crate::events::AppEvent;

/// Trait for emitting supervisor events.
///
/// # Implementations
///
/// - `NoopEmitter` - for tests and one-shot CLI commands
/// - Adapter-specific implementations (the CLI's tracing emitter, channels)
pub trait AppEventEmitter: Send + Sync {
    /// Emit an event. Must not block.
    fn emit(&self, event: AppEvent);

    /// Clone this emitter into a boxed trait object.
    fn clone_box(&self) -> Box<dyn AppEventEmitter>;
}

/// A no-op event emitter that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    /// Create a new no-op emitter.
    pub const fn new() -> Self {
        Self
    }
}

impl AppEventEmitter for NoopEmitter {
    fn emit(&self, _event: AppEvent) {}

    fn clone_box(&self) -> Box<dyn AppEventEmitter> {
        Box::new(self.clone())
    }
}
