//! In-memory configuration store for tests and ephemeral use.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use toolvisor_core::domain::{RuntimeRecord, ServerDefinition, ServerFilter, ServerPatch};
use toolvisor_core::ports::{RepositoryError, ServerRepository};

use super::sort_for_listing;

/// Process-local store; contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryServerRepository {
    servers: RwLock<BTreeMap<String, ServerDefinition>>,
}

impl MemoryServerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ServerRepository for MemoryServerRepository {
    async fn insert(
        &self,
        server: ServerDefinition,
    ) -> Result<ServerDefinition, RepositoryError> {
        let mut servers = self.servers.write().await;
        if servers.contains_key(&server.id) {
            return Err(RepositoryError::Conflict(server.id));
        }
        servers.insert(server.id.clone(), server.clone());
        Ok(server)
    }

    async fn get(&self, id: &str) -> Result<ServerDefinition, RepositoryError> {
        self.servers
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn list(&self, filter: &ServerFilter) -> Result<Vec<ServerDefinition>, RepositoryError> {
        let mut servers: Vec<ServerDefinition> = self
            .servers
            .read()
            .await
            .values()
            .filter(|s| filter.matches(s.status, s.enabled))
            .cloned()
            .collect();
        sort_for_listing(&mut servers);
        Ok(servers)
    }

    async fn update(
        &self,
        id: &str,
        patch: &ServerPatch,
    ) -> Result<ServerDefinition, RepositoryError> {
        let mut servers = self.servers.write().await;
        let server = servers
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        server.apply_patch(patch, Utc::now());
        Ok(server.clone())
    }

    async fn update_status(
        &self,
        id: &str,
        record: &RuntimeRecord,
    ) -> Result<(), RepositoryError> {
        let mut servers = self.servers.write().await;
        let server = servers
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        server.apply_runtime(record, Utc::now());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.servers.write().await.remove(id).is_some())
    }
}
