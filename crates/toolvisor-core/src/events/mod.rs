//! Canonical event union for supervisor notifications.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag:
//!
//! ```json
//! { "type": "server_started", "serverId": "git-1", "serverName": "Git", "pid": 4242 }
//! ```

mod server;

use serde::{Deserialize, Serialize};

use crate::ports::McpErrorInfo;

pub use server::ServerSummary;

/// Events emitted by the registry and the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A server definition was added.
    ServerAdded {
        /// Summary of the added server.
        server: ServerSummary,
    },

    /// A server definition was updated.
    ServerUpdated {
        /// Summary after the update.
        server: ServerSummary,
    },

    /// A server definition was removed.
    ServerRemoved {
        #[serde(rename = "serverId")]
        server_id: String,
    },

    /// A server process passed its start grace delay.
    ServerStarted {
        #[serde(rename = "serverId")]
        server_id: String,
        #[serde(rename = "serverName")]
        server_name: String,
        /// OS process id.
        pid: u32,
    },

    /// A server process was stopped on request.
    ServerStopped {
        #[serde(rename = "serverId")]
        server_id: String,
        #[serde(rename = "serverName")]
        server_name: String,
    },

    /// A supervised process exited without being asked to.
    ServerDied {
        #[serde(rename = "serverId")]
        server_id: String,
        #[serde(rename = "serverName")]
        server_name: String,
        /// Exit code, if the process was not killed by a signal.
        #[serde(rename = "exitCode")]
        exit_code: Option<i32>,
    },

    /// A lifecycle operation failed.
    ServerError {
        /// User-safe error details.
        error: McpErrorInfo,
    },
}

impl AppEvent {
    /// Stable event name (the serialized `type` tag).
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::ServerAdded { .. } => "server_added",
            Self::ServerUpdated { .. } => "server_updated",
            Self::ServerRemoved { .. } => "server_removed",
            Self::ServerStarted { .. } => "server_started",
            Self::ServerStopped { .. } => "server_stopped",
            Self::ServerDied { .. } => "server_died",
            Self::ServerError { .. } => "server_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_event_wire_format() {
        let event = AppEvent::server_started("git-1", "Git", 4242);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "server_started");
        assert_eq!(json["serverId"], "git-1");
        assert_eq!(json["pid"], 4242);
        assert_eq!(event.event_name(), "server_started");
    }

    #[test]
    fn test_died_event_round_trip() {
        let event = AppEvent::server_died("git-1", "Git", Some(1));
        let json = serde_json::to_string(&event).unwrap();
        let back: AppEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
