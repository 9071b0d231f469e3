//! Event emitter that writes supervisor events to the log.

use toolvisor_core::{AppEvent, AppEventEmitter};
use tracing::{info, warn};

/// Logs every event as a structured `tracing` record.
#[derive(Debug, Clone, Default)]
pub struct TracingEmitter;

impl AppEventEmitter for TracingEmitter {
    fn emit(&self, event: AppEvent) {
        let payload = serde_json::to_string(&event).unwrap_or_default();
        match event {
            AppEvent::ServerDied { .. } | AppEvent::ServerError { .. } => {
                warn!(event = event.event_name(), %payload, "Supervisor event");
            }
            _ => info!(event = event.event_name(), %payload, "Supervisor event"),
        }
    }

    fn clone_box(&self) -> Box<dyn AppEventEmitter> {
        Box::new(self.clone())
    }
}
