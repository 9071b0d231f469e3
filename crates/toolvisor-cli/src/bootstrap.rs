//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - Supervisor settings (environment, then command-line overrides)
//! - Configuration store (via toolvisor-db)
//! - Tool-server service (via toolvisor-mcp)
//!
//! Command handlers receive the composed context and delegate work to it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use toolvisor_core::{StoreKind, SupervisorSettings, validate_settings};
use toolvisor_db::open_repository;
use toolvisor_mcp::McpService;
use tracing::debug;

use crate::emitter::TracingEmitter;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub settings: SupervisorSettings,
}

impl CliConfig {
    /// Settings from `TOOLVISOR_*` variables with the given store overrides.
    pub fn from_env(store: Option<StoreKind>, store_path: Option<PathBuf>) -> Result<Self> {
        let settings = SupervisorSettings::from_env().context("Invalid TOOLVISOR_* settings")?;
        Ok(Self::with_overrides(settings, store, store_path))
    }

    /// Apply command-line store overrides on top of `settings`.
    pub fn with_overrides(
        mut settings: SupervisorSettings,
        store: Option<StoreKind>,
        store_path: Option<PathBuf>,
    ) -> Self {
        if let Some(kind) = store {
            if kind != settings.store.kind {
                // A path configured for another backend does not carry over
                settings.store.path = None;
            }
            settings.store.kind = kind;
        }
        if let Some(path) = store_path {
            settings.store.path = Some(path);
        }
        Self { settings }
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    /// Tool-server service.
    pub mcp: Arc<McpService>,
}

impl CliContext {
    /// Access the tool-server service.
    pub fn mcp(&self) -> &Arc<McpService> {
        &self.mcp
    }
}

/// Bootstrap the CLI application.
///
/// This is the composition root. It:
/// 1. Validates the supervisor settings
/// 2. Opens the configured store
/// 3. Creates the service with the store and a logging emitter
pub async fn bootstrap(config: CliConfig) -> Result<CliContext> {
    validate_settings(&config.settings).context("Invalid supervisor settings")?;

    let store = &config.settings.store;
    debug!(store = %store.kind, path = ?store.path, "Opening configuration store");
    let repository = open_repository(store).await?;

    let mcp = Arc::new(McpService::new(
        repository,
        Arc::new(TracingEmitter),
        config.settings,
    ));

    Ok(CliContext { mcp })
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolvisor_core::StoreConfig;

    #[test]
    fn test_store_override_drops_foreign_path() {
        let settings = SupervisorSettings {
            store: StoreConfig::file("/data/servers.json"),
            ..SupervisorSettings::default()
        };

        let config = CliConfig::with_overrides(settings, Some(StoreKind::Sqlite), None);

        assert_eq!(config.settings.store.kind, StoreKind::Sqlite);
        assert_eq!(config.settings.store.path, None);
    }

    #[test]
    fn test_store_path_override() {
        let config = CliConfig::with_overrides(
            SupervisorSettings::default(),
            None,
            Some(PathBuf::from("/tmp/custom.json")),
        );
        assert_eq!(config.settings.store.kind, StoreKind::File);
        assert_eq!(
            config.settings.store.path,
            Some(PathBuf::from("/tmp/custom.json"))
        );
    }

    #[tokio::test]
    async fn test_bootstrap_with_file_store() {
        let temp = tempfile::tempdir().unwrap();
        let config = CliConfig::with_overrides(
            SupervisorSettings::for_tests(),
            Some(StoreKind::File),
            Some(temp.path().join("servers.json")),
        );

        let ctx = bootstrap(config).await.unwrap();
        let seeded = ctx.mcp().seed_defaults().await.unwrap();

        assert_eq!(seeded.len(), 4);
        assert!(temp.path().join("servers.json").exists());
    }
}
