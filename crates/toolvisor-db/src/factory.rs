//! Store selection.
//!
//! Construction only; no domain logic lives here.

use std::sync::Arc;

use anyhow::{Context, Result};

use toolvisor_core::ports::ServerRepository;
use toolvisor_core::settings::{StoreConfig, StoreKind};

use crate::repositories::{
    JsonFileServerRepository, MemoryServerRepository, SqliteServerRepository,
};
use crate::setup::setup_database;

/// Open the backend named by `config`.
///
/// File-backed stores default to the data directory when `config.path`
/// is unset.
pub async fn open_repository(config: &StoreConfig) -> Result<Arc<dyn ServerRepository>> {
    let path = config
        .resolved_path()
        .context("Failed to resolve store location")?;

    let repo: Arc<dyn ServerRepository> = match (config.kind, path) {
        (StoreKind::Memory, _) => Arc::new(MemoryServerRepository::new()),
        (StoreKind::File, Some(path)) => {
            let repo = JsonFileServerRepository::open(&path)
                .await
                .with_context(|| format!("Failed to open registry {}", path.display()))?;
            Arc::new(repo)
        }
        (StoreKind::Sqlite, Some(path)) => {
            let pool = setup_database(&path)
                .await
                .with_context(|| format!("Failed to open database {}", path.display()))?;
            Arc::new(SqliteServerRepository::new(pool))
        }
        (kind, None) => anyhow::bail!("No location for {kind} store"),
    };

    tracing::info!(store = %config.kind, "Configuration store opened");
    Ok(repo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolvisor_core::domain::ServerFilter;

    #[tokio::test]
    async fn test_open_each_backend() {
        let temp = tempfile::tempdir().unwrap();

        for config in [
            StoreConfig::memory(),
            StoreConfig::file(temp.path().join("servers.json")),
            StoreConfig::sqlite(temp.path().join("toolvisor.db")),
        ] {
            let repo = open_repository(&config).await.unwrap();
            assert!(repo.list(&ServerFilter::default()).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_corrupt_registry_fails_to_open() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("servers.json");
        std::fs::write(&path, "[[[").unwrap();

        assert!(open_repository(&StoreConfig::file(&path)).await.is_err());
    }
}
