//! JSON-file configuration store.
//!
//! The registry is a single document:
//!
//! ```json
//! { "servers": [ ... ], "lastUpdated": "2026-01-01T00:00:00Z" }
//! ```
//!
//! Every write serializes the whole document to a sibling temp file and
//! renames it over the original, so readers never observe a torn file.
//! The in-memory copy only changes after the rename succeeded.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use toolvisor_core::domain::{RuntimeRecord, ServerDefinition, ServerFilter, ServerPatch};
use toolvisor_core::ports::{RepositoryError, ServerRepository};

use super::sort_for_listing;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryDocument {
    #[serde(default)]
    servers: Vec<ServerDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_updated: Option<DateTime<Utc>>,
}

/// Store backed by a JSON document on disk.
#[derive(Debug)]
pub struct JsonFileServerRepository {
    path: PathBuf,
    servers: Mutex<Vec<ServerDefinition>>,
}

impl JsonFileServerRepository {
    /// Open the registry at `path`.
    ///
    /// A missing or empty file is an empty registry. A file that does not
    /// parse is an `Internal` error; it is never overwritten silently.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let servers = match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => Vec::new(),
            Ok(text) => {
                let document: RegistryDocument = serde_json::from_str(&text).map_err(|e| {
                    RepositoryError::Internal(format!(
                        "Corrupt registry file {}: {e}",
                        path.display()
                    ))
                })?;
                document.servers
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(RepositoryError::Internal(format!(
                    "Failed to read registry file {}: {e}",
                    path.display()
                )));
            }
        };

        tracing::debug!(path = %path.display(), count = servers.len(), "Opened JSON registry");

        Ok(Self {
            path,
            servers: Mutex::new(servers),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, servers: &[ServerDefinition]) -> Result<(), RepositoryError> {
        let document = RegistryDocument {
            servers: servers.to_vec(),
            last_updated: Some(Utc::now()),
        };
        let json = serde_json::to_vec_pretty(&document)
            .map_err(|e| RepositoryError::Internal(format!("Failed to encode registry: {e}")))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| io_error("create directory for", &self.path, &e))?;
            }
        }

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        tokio::fs::write(&temp_path, &json)
            .await
            .map_err(|e| io_error("write", &temp_path, &e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| io_error("replace", &self.path, &e))?;

        Ok(())
    }

    /// Run `mutate` on a copy of the registry, persist it, then commit.
    async fn write_with<T, F>(&self, mutate: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut Vec<ServerDefinition>) -> Result<T, RepositoryError> + Send,
        T: Send,
    {
        let mut guard = self.servers.lock().await;
        let mut next = guard.clone();
        let output = mutate(&mut next)?;
        self.persist(&next).await?;
        *guard = next;
        Ok(output)
    }
}

fn io_error(action: &str, path: &Path, err: &std::io::Error) -> RepositoryError {
    RepositoryError::Internal(format!("Failed to {action} {}: {err}", path.display()))
}

fn find_mut<'a>(
    servers: &'a mut [ServerDefinition],
    id: &str,
) -> Result<&'a mut ServerDefinition, RepositoryError> {
    servers
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
}

#[async_trait]
impl ServerRepository for JsonFileServerRepository {
    async fn insert(
        &self,
        server: ServerDefinition,
    ) -> Result<ServerDefinition, RepositoryError> {
        self.write_with(move |servers| {
            if servers.iter().any(|s| s.id == server.id) {
                return Err(RepositoryError::Conflict(server.id));
            }
            servers.push(server.clone());
            Ok(server)
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<ServerDefinition, RepositoryError> {
        self.servers
            .lock()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn list(&self, filter: &ServerFilter) -> Result<Vec<ServerDefinition>, RepositoryError> {
        let mut servers: Vec<ServerDefinition> = self
            .servers
            .lock()
            .await
            .iter()
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
        self.write_with(|servers| {
            let server = find_mut(servers, id)?;
            server.apply_patch(patch, Utc::now());
            Ok(server.clone())
        })
        .await
    }

    async fn update_status(
        &self,
        id: &str,
        record: &RuntimeRecord,
    ) -> Result<(), RepositoryError> {
        self.write_with(|servers| {
            find_mut(servers, id)?.apply_runtime(record, Utc::now());
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let mut guard = self.servers.lock().await;
        let Some(index) = guard.iter().position(|s| s.id == id) else {
            return Ok(false);
        };
        let mut next = guard.clone();
        next.remove(index);
        self.persist(&next).await?;
        *guard = next;
        Ok(true)
    }
}
