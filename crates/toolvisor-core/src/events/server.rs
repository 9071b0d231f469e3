//! Tool-server lifecycle events.

use serde::{Deserialize, Serialize};

use super::AppEvent;
use crate::domain::ServerDefinition;
use crate::ports::McpErrorInfo;

/// Lightweight representation of a server for event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSummary {
    pub id: String,
    pub name: String,
    pub command: String,
    pub enabled: bool,
}

impl From<&ServerDefinition> for ServerSummary {
    fn from(server: &ServerDefinition) -> Self {
        Self {
            id: server.id.clone(),
            name: server.name.clone(),
            command: server.command.clone(),
            enabled: server.enabled,
        }
    }
}

impl AppEvent {
    pub const fn server_added(server: ServerSummary) -> Self {
        Self::ServerAdded { server }
    }

    pub const fn server_updated(server: ServerSummary) -> Self {
        Self::ServerUpdated { server }
    }

    pub fn server_removed(server_id: impl Into<String>) -> Self {
        Self::ServerRemoved {
            server_id: server_id.into(),
        }
    }

    pub fn server_started(
        server_id: impl Into<String>,
        server_name: impl Into<String>,
        pid: u32,
    ) -> Self {
        Self::ServerStarted {
            server_id: server_id.into(),
            server_name: server_name.into(),
            pid,
        }
    }

    pub fn server_stopped(server_id: impl Into<String>, server_name: impl Into<String>) -> Self {
        Self::ServerStopped {
            server_id: server_id.into(),
            server_name: server_name.into(),
        }
    }

    pub fn server_died(
        server_id: impl Into<String>,
        server_name: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::ServerDied {
            server_id: server_id.into(),
            server_name: server_name.into(),
            exit_code,
        }
    }

    pub const fn server_error(error: McpErrorInfo) -> Self {
        Self::ServerError { error }
    }
}
