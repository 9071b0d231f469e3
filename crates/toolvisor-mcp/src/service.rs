//! High-level service for managing tool servers.
//!
//! This service provides the API used by the CLI and any other adapter.
//! It uses dependency injection for the repository and event emitter.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use toolvisor_core::{
    AppEvent, AppEventEmitter, NewServer, RepositoryError, ServerDefinition, ServerFilter,
    ServerPatch, ServerRepository, ServerStatus, ServiceError, SupervisorSettings,
};

use crate::bulk::BulkStopReport;
use crate::defaults::default_servers;
use crate::manager::{McpManager, RuntimeState};

/// Server definition merged with this instance's runtime view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerInfo {
    /// Stored definition (its runtime fields are the last persisted values)
    pub server: ServerDefinition,
    /// Effective status
    pub status: ServerStatus,
    /// Effective process id
    pub process_id: Option<u32>,
    /// Whether this instance owns the process
    pub supervised: bool,
}

impl McpServerInfo {
    fn merge(server: ServerDefinition, runtime: Option<RuntimeState>) -> Self {
        match runtime {
            Some(state) => Self {
                status: state.status,
                process_id: state.process_id,
                supervised: true,
                server,
            },
            None => Self {
                status: server.status,
                process_id: server.process_id,
                supervised: false,
                server,
            },
        }
    }
}

/// Status counts across the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySummary {
    pub total: usize,
    pub running: usize,
    pub starting: usize,
    pub stopped: usize,
    pub error: usize,
    pub enabled: usize,
}

impl RegistrySummary {
    fn from_servers(servers: &[McpServerInfo]) -> Self {
        let mut summary = Self {
            total: servers.len(),
            ..Self::default()
        };
        for info in servers {
            match info.status {
                ServerStatus::Running => summary.running += 1,
                ServerStatus::Starting => summary.starting += 1,
                ServerStatus::Stopped => summary.stopped += 1,
                ServerStatus::Error => summary.error += 1,
            }
            if info.server.enabled {
                summary.enabled += 1;
            }
        }
        summary
    }
}

/// Tool-server service providing unified access to registry and lifecycle.
///
/// This is the main interface used by adapters.
pub struct McpService {
    repository: Arc<dyn ServerRepository>,
    pub(crate) manager: Arc<McpManager>,
    emitter: Arc<dyn AppEventEmitter>,
}

impl McpService {
    /// Create a new service with injected dependencies.
    pub fn new(
        repository: Arc<dyn ServerRepository>,
        emitter: Arc<dyn AppEventEmitter>,
        settings: SupervisorSettings,
    ) -> Self {
        let manager = Arc::new(McpManager::new(
            Arc::clone(&repository),
            Arc::clone(&emitter),
            settings,
        ));
        Self {
            repository,
            manager,
            emitter,
        }
    }

    pub fn settings(&self) -> &SupervisorSettings {
        self.manager.settings()
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// Add a new server definition.
    pub async fn add_server(&self, new_server: NewServer) -> Result<ServerDefinition, ServiceError> {
        new_server.validate()?;

        let server = ServerDefinition::from_new(new_server, Utc::now());
        let created = self.repository.insert(server).await?;

        info!(server_id = %created.id, server_name = %created.name, "Server added");
        self.emitter.emit(AppEvent::server_added((&created).into()));
        Ok(created)
    }

    /// Get one server with its effective status.
    pub async fn get_server(&self, id: &str) -> Result<McpServerInfo, ServiceError> {
        let server = self.repository.get(id).await?;
        let runtime = self.manager.runtime_state(id).await;
        Ok(McpServerInfo::merge(server, runtime))
    }

    /// List servers, filtering on effective (merged) status.
    pub async fn list_servers(&self, filter: &ServerFilter) -> Result<Vec<McpServerInfo>, ServiceError> {
        let servers = self.repository.list(&ServerFilter::default()).await?;
        let mut runtime = self.manager.runtime_snapshot().await;

        Ok(servers
            .into_iter()
            .map(|server| {
                let state = runtime.remove(&server.id);
                McpServerInfo::merge(server, state)
            })
            .filter(|info| filter.matches(info.status, info.server.enabled))
            .collect())
    }

    /// Apply a partial update.
    ///
    /// Disabling a supervised server stops it first. Other changes to a
    /// running server take effect on its next start.
    pub async fn update_server(&self, id: &str, patch: ServerPatch) -> Result<McpServerInfo, ServiceError> {
        patch.validate()?;
        if patch.is_empty() {
            return self.get_server(id).await;
        }

        let updated = self.manager.update(id, &patch).await?;

        debug!(server_id = %id, "Server updated");
        self.emitter.emit(AppEvent::server_updated((&updated).into()));

        let runtime = self.manager.runtime_state(id).await;
        Ok(McpServerInfo::merge(updated, runtime))
    }

    /// Remove a server, stopping it first if this instance runs it.
    pub async fn remove_server(&self, id: &str) -> Result<(), ServiceError> {
        self.manager.delete(id).await?;
        self.emitter.emit(AppEvent::server_removed(id));
        Ok(())
    }

    /// Status counts across all servers.
    pub async fn status_summary(&self) -> Result<RegistrySummary, ServiceError> {
        let servers = self.list_servers(&ServerFilter::default()).await?;
        Ok(RegistrySummary::from_servers(&servers))
    }

    /// Insert the default catalogue, skipping ids that already exist.
    ///
    /// Returns the ids that were inserted.
    pub async fn seed_defaults(&self) -> Result<Vec<String>, ServiceError> {
        let mut inserted = Vec::new();
        for new_server in default_servers(self.settings().default_health_check_interval_secs) {
            let id = new_server.id.clone().unwrap_or_default();
            match self.repository.get(&id).await {
                Ok(_) => continue,
                Err(RepositoryError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }

            match self.add_server(new_server).await {
                Ok(server) => inserted.push(server.id),
                // Lost a race with another writer; the id exists now
                Err(ServiceError::DuplicateId(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(inserted)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start a server and return its pid.
    pub async fn start_server(&self, id: &str) -> Result<u32, ServiceError> {
        self.manager.start(id).await
    }

    /// Stop a server this instance supervises.
    pub async fn stop_server(&self, id: &str) -> Result<(), ServiceError> {
        self.manager.stop(id).await
    }

    /// Restart a server and return its new pid.
    pub async fn restart_server(&self, id: &str) -> Result<u32, ServiceError> {
        self.manager.restart(id).await
    }

    /// Whether this instance currently runs `id`.
    pub async fn is_supervised(&self, id: &str) -> bool {
        self.manager.is_supervised(id).await
    }

    /// Local runtime view, keyed by server id.
    pub async fn runtime_snapshot(&self) -> HashMap<String, RuntimeState> {
        self.manager.runtime_snapshot().await
    }

    /// Stop every server this instance supervises.
    pub async fn shutdown(&self) -> BulkStopReport {
        let report = self.stop_all().await;
        info!(
            stopped = report.stopped_count,
            failed = report.failed.len(),
            "Supervisor shut down"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolvisor_core::NoopEmitter;
    use toolvisor_db::MemoryServerRepository;

    fn service() -> McpService {
        McpService::new(
            Arc::new(MemoryServerRepository::new()),
            Arc::new(NoopEmitter::new()),
            SupervisorSettings::for_tests(),
        )
    }

    #[tokio::test]
    async fn test_add_validates_fields() {
        let service = service();

        let err = service
            .add_server(NewServer::new("", "cat"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_field");

        let err = service
            .add_server(NewServer::new("Bad", "npx -y thing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidField { ref field, .. } if field == "command"));
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let service = service();
        service
            .add_server(NewServer::new("Git", "cat").with_id("git-1"))
            .await
            .unwrap();

        let err = service
            .add_server(NewServer::new("Other", "cat").with_id("git-1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "duplicate_id");
        assert_eq!(service.get_server("git-1").await.unwrap().server.name, "Git");
    }

    #[tokio::test]
    async fn test_update_applies_only_present_fields() {
        let service = service();
        service
            .add_server(
                NewServer::new("Git", "cat")
                    .with_id("git-1")
                    .with_description("original"),
            )
            .await
            .unwrap();

        let patch = ServerPatch {
            name: Some("Git Server".to_string()),
            ..ServerPatch::default()
        };
        let info = service.update_server("git-1", patch).await.unwrap();

        assert_eq!(info.server.name, "Git Server");
        assert_eq!(info.server.description, "original");
        assert_eq!(info.status, ServerStatus::Stopped);
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let service = service();
        let patch = ServerPatch {
            enabled: Some(true),
            ..ServerPatch::default()
        };
        let err = service.update_server("ghost", patch).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_seed_defaults_is_idempotent() {
        let service = service();

        let first = service.seed_defaults().await.unwrap();
        assert_eq!(first.len(), 4);
        assert!(first.contains(&"git-1".to_string()));

        let second = service.seed_defaults().await.unwrap();
        assert!(second.is_empty());

        let all = service.list_servers(&ServerFilter::default()).await.unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.iter().all(|info| !info.server.auto_start));
    }

    #[tokio::test]
    async fn test_server_info_serializes_camel_case() {
        let service = service();
        service
            .add_server(NewServer::new("Git", "cat").with_id("git-1"))
            .await
            .unwrap();

        let info = service.get_server("git-1").await.unwrap();
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["status"], "stopped");
        assert!(json["processId"].is_null());
        assert_eq!(json["supervised"], false);
        assert_eq!(json["server"]["id"], "git-1");
        assert_eq!(json["server"]["autoStart"], true);
        assert!(json["server"].get("auto_start").is_none());
    }

    #[tokio::test]
    async fn test_summary_counts_persisted_status() {
        let service = service();
        service
            .add_server(NewServer::new("A", "cat").with_id("a"))
            .await
            .unwrap();
        service
            .add_server(NewServer::new("B", "cat").with_id("b").with_enabled(false))
            .await
            .unwrap();

        let summary = service.status_summary().await.unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.stopped, 2);
        assert_eq!(summary.enabled, 1);
        assert_eq!(summary.running, 0);
    }
}
