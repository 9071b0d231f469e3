//! Behaviour every configuration store backend must share.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;
use toolvisor_core::domain::{
    NewServer, RuntimeRecord, ServerDefinition, ServerFilter, ServerPatch, ServerStatus,
};
use toolvisor_core::ports::{RepositoryError, ServerRepository};
use toolvisor_core::settings::StoreConfig;
use toolvisor_db::open_repository;

async fn backends() -> (TempDir, Vec<(&'static str, Arc<dyn ServerRepository>)>) {
    let temp = tempfile::tempdir().unwrap();
    let memory = open_repository(&StoreConfig::memory()).await.unwrap();
    let file = open_repository(&StoreConfig::file(temp.path().join("servers.json")))
        .await
        .unwrap();
    let sqlite = open_repository(&StoreConfig::sqlite(temp.path().join("toolvisor.db")))
        .await
        .unwrap();
    (
        temp,
        vec![("memory", memory), ("file", file), ("sqlite", sqlite)],
    )
}

fn server_at(id: &str, created_at: DateTime<Utc>) -> ServerDefinition {
    ServerDefinition::from_new(
        NewServer::new(format!("Server {id}"), "cat")
            .with_id(id)
            .with_env("MODE", "test"),
        created_at,
    )
}

fn server(id: &str, offset_secs: i64) -> ServerDefinition {
    server_at(id, Utc::now() + Duration::seconds(offset_secs))
}

#[tokio::test]
async fn list_orders_by_creation_then_id() {
    let (_temp, backends) = backends().await;
    for (name, repo) in backends {
        let base = DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        repo.insert(server_at("c", base + Duration::seconds(2)))
            .await
            .unwrap();
        repo.insert(server_at("b", base + Duration::seconds(1)))
            .await
            .unwrap();
        repo.insert(server_at("a", base + Duration::seconds(2)))
            .await
            .unwrap();

        let ids: Vec<String> = repo
            .list(&ServerFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, ["b", "a", "c"], "backend {name}");
    }
}

#[tokio::test]
async fn duplicate_insert_is_conflict_and_keeps_original() {
    let (_temp, backends) = backends().await;
    for (name, repo) in backends {
        repo.insert(server("git-1", 0)).await.unwrap();

        let mut other = server("git-1", 0);
        other.name = "Impostor".to_string();
        let result = repo.insert(other).await;
        assert!(
            matches!(result, Err(RepositoryError::Conflict(_))),
            "backend {name}"
        );
        assert_eq!(repo.get("git-1").await.unwrap().name, "Server git-1");
    }
}

#[tokio::test]
async fn patch_leaves_runtime_fields_alone() {
    let (_temp, backends) = backends().await;
    for (name, repo) in backends {
        repo.insert(server("git-1", 0)).await.unwrap();
        repo.update_status("git-1", &RuntimeRecord::running(31337))
            .await
            .unwrap();

        let before = repo.get("git-1").await.unwrap();
        let updated = repo
            .update(
                "git-1",
                &ServerPatch {
                    auto_start: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!updated.auto_start, "backend {name}");
        assert_eq!(updated.status, ServerStatus::Running, "backend {name}");
        assert_eq!(updated.process_id, Some(31337), "backend {name}");
        assert_eq!(updated.environment["MODE"], "test", "backend {name}");
        assert!(updated.updated_at >= before.updated_at, "backend {name}");
    }
}

#[tokio::test]
async fn missing_ids_are_reported() {
    let (_temp, backends) = backends().await;
    for (name, repo) in backends {
        assert!(
            matches!(repo.get("ghost").await, Err(RepositoryError::NotFound(_))),
            "backend {name}"
        );
        assert!(
            matches!(
                repo.update("ghost", &ServerPatch::default()).await,
                Err(RepositoryError::NotFound(_))
            ),
            "backend {name}"
        );
        assert!(
            matches!(
                repo.update_status("ghost", &RuntimeRecord::stopped()).await,
                Err(RepositoryError::NotFound(_))
            ),
            "backend {name}"
        );
        assert!(!repo.delete("ghost").await.unwrap(), "backend {name}");
    }
}

#[tokio::test]
async fn filter_on_status_and_enabled() {
    let (_temp, backends) = backends().await;
    for (name, repo) in backends {
        repo.insert(server("a", 0)).await.unwrap();
        let mut disabled = server("b", 1);
        disabled.enabled = false;
        repo.insert(disabled).await.unwrap();
        repo.update_status("a", &RuntimeRecord::failed("boom"))
            .await
            .unwrap();

        let errored = repo
            .list(&ServerFilter::with_status(ServerStatus::Error))
            .await
            .unwrap();
        assert_eq!(errored.len(), 1, "backend {name}");
        assert_eq!(errored[0].id, "a");

        let off = repo.list(&ServerFilter::with_enabled(false)).await.unwrap();
        assert_eq!(off.len(), 1, "backend {name}");
        assert_eq!(off[0].id, "b");

        let none = repo
            .list(&ServerFilter {
                status: Some(ServerStatus::Error),
                enabled: Some(false),
            })
            .await
            .unwrap();
        assert!(none.is_empty(), "backend {name}");
    }
}
