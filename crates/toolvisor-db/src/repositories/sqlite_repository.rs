//! `SQLite` implementation of the configuration store.
//!
//! Environment variables live in `tool_server_env` with base64-encoded
//! values (encoding, not encryption). Arguments and auxiliary files are
//! stored as JSON text columns.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use toolvisor_core::domain::{
    AuxiliaryFile, RuntimeRecord, ServerDefinition, ServerFilter, ServerPatch, ServerStatus,
};
use toolvisor_core::ports::{RepositoryError, ServerRepository};

/// `SQLite` implementation of the server repository.
pub struct SqliteServerRepository {
    pool: SqlitePool,
}

impl SqliteServerRepository {
    /// Create a repository over a pool prepared by `setup_database`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal row types for database queries
// ─────────────────────────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct ServerRow {
    id: String,
    name: String,
    description: String,
    command: String,
    arguments: String,
    working_directory: Option<String>,
    enabled: bool,
    auto_start: bool,
    health_check_interval_secs: i64,
    files: String,
    status: String,
    process_id: Option<i64>,
    last_error: Option<String>,
    created_at: String,
    updated_at: String,
}

#[derive(sqlx::FromRow)]
struct EnvRow {
    key: String,
    value: String,
}

const SELECT_COLUMNS: &str = "SELECT id, name, description, command, arguments, working_directory, \
     enabled, auto_start, health_check_interval_secs, files, status, process_id, last_error, \
     created_at, updated_at FROM tool_servers";

// ─────────────────────────────────────────────────────────────────────────────
// Helper functions
// ─────────────────────────────────────────────────────────────────────────────

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Internal(format!("Invalid timestamp {s:?}: {e}")))
}

fn decode_env_value(encoded: &str) -> Result<String, RepositoryError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| RepositoryError::Internal(format!("Failed to decode env var: {e}")))?;

    String::from_utf8(bytes)
        .map_err(|e| RepositoryError::Internal(format!("Invalid UTF-8 in env var: {e}")))
}

fn encode_env_value(value: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value)
        .map_err(|e| RepositoryError::Internal(format!("Failed to encode column: {e}")))
}

fn map_sqlx_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Internal(e.to_string())
}

fn map_insert_error(e: sqlx::Error, id: &str) -> RepositoryError {
    if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
        return RepositoryError::Conflict(id.to_string());
    }
    map_sqlx_error(e)
}

fn row_to_server(
    row: ServerRow,
    environment: BTreeMap<String, String>,
) -> Result<ServerDefinition, RepositoryError> {
    let arguments: Vec<String> = serde_json::from_str(&row.arguments)
        .map_err(|e| RepositoryError::Internal(format!("Invalid arguments column: {e}")))?;
    let files: Vec<AuxiliaryFile> = serde_json::from_str(&row.files)
        .map_err(|e| RepositoryError::Internal(format!("Invalid files column: {e}")))?;
    let status: ServerStatus = row.status.parse().map_err(RepositoryError::Internal)?;
    let health_check_interval_secs = u64::try_from(row.health_check_interval_secs)
        .map_err(|e| RepositoryError::Internal(format!("Invalid interval: {e}")))?;
    let process_id = row
        .process_id
        .map(u32::try_from)
        .transpose()
        .map_err(|e| RepositoryError::Internal(format!("Invalid process id: {e}")))?;

    Ok(ServerDefinition {
        id: row.id,
        name: row.name,
        description: row.description,
        command: row.command,
        arguments,
        environment,
        working_directory: row.working_directory,
        enabled: row.enabled,
        auto_start: row.auto_start,
        health_check_interval_secs,
        files,
        status,
        process_id,
        last_error: row.last_error,
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}

async fn fetch_env(
    conn: &mut SqliteConnection,
    server_id: &str,
) -> Result<BTreeMap<String, String>, RepositoryError> {
    let rows = sqlx::query_as::<_, EnvRow>(
        "SELECT key, value FROM tool_server_env WHERE server_id = ? ORDER BY key",
    )
    .bind(server_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    let mut env = BTreeMap::new();
    for row in rows {
        env.insert(row.key, decode_env_value(&row.value)?);
    }
    Ok(env)
}

async fn replace_env(
    conn: &mut SqliteConnection,
    server_id: &str,
    environment: &BTreeMap<String, String>,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM tool_server_env WHERE server_id = ?")
        .bind(server_id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    for (key, value) in environment {
        sqlx::query("INSERT INTO tool_server_env (server_id, key, value) VALUES (?, ?, ?)")
            .bind(server_id)
            .bind(key)
            .bind(encode_env_value(value))
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
    }
    Ok(())
}

async fn fetch_server(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<ServerDefinition, RepositoryError> {
    let row = sqlx::query_as::<_, ServerRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

    let env = fetch_env(conn, id).await?;
    row_to_server(row, env)
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl ServerRepository for SqliteServerRepository {
    async fn insert(
        &self,
        server: ServerDefinition,
    ) -> Result<ServerDefinition, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            r"
            INSERT INTO tool_servers (id, name, description, command, arguments, working_directory,
                enabled, auto_start, health_check_interval_secs, files, status, process_id,
                last_error, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&server.id)
        .bind(&server.name)
        .bind(&server.description)
        .bind(&server.command)
        .bind(to_json(&server.arguments)?)
        .bind(&server.working_directory)
        .bind(server.enabled)
        .bind(server.auto_start)
        .bind(i64::try_from(server.health_check_interval_secs).unwrap_or(i64::MAX))
        .bind(to_json(&server.files)?)
        .bind(server.status.as_str())
        .bind(server.process_id.map(i64::from))
        .bind(&server.last_error)
        .bind(format_datetime(&server.created_at))
        .bind(format_datetime(&server.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, &server.id))?;

        replace_env(&mut tx, &server.id, &server.environment).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(server)
    }

    async fn get(&self, id: &str) -> Result<ServerDefinition, RepositoryError> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        fetch_server(&mut conn, id).await
    }

    async fn list(&self, filter: &ServerFilter) -> Result<Vec<ServerDefinition>, RepositoryError> {
        let status = filter.status.map(ServerStatus::as_str);
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;

        let rows = sqlx::query_as::<_, ServerRow>(&format!(
            "{SELECT_COLUMNS} WHERE (? IS NULL OR status = ?) AND (? IS NULL OR enabled = ?) \
             ORDER BY created_at, id"
        ))
        .bind(status)
        .bind(status)
        .bind(filter.enabled)
        .bind(filter.enabled)
        .fetch_all(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

        let mut servers = Vec::with_capacity(rows.len());
        for row in rows {
            let env = fetch_env(&mut conn, &row.id).await?;
            servers.push(row_to_server(row, env)?);
        }
        Ok(servers)
    }

    async fn update(
        &self,
        id: &str,
        patch: &ServerPatch,
    ) -> Result<ServerDefinition, RepositoryError> {
        let arguments = patch.arguments.as_ref().map(to_json).transpose()?;
        let files = patch.files.as_deref().map(to_json).transpose()?;
        let interval = patch
            .health_check_interval_secs
            .map(|secs| i64::try_from(secs).unwrap_or(i64::MAX));
        let (set_working_directory, working_directory) = match patch.working_directory {
            Some(ref dir) => (true, dir.clone()),
            None => (false, None),
        };

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r"
            UPDATE tool_servers SET
                name = COALESCE(?, name),
                description = COALESCE(?, description),
                command = COALESCE(?, command),
                arguments = COALESCE(?, arguments),
                working_directory = CASE WHEN ? THEN ? ELSE working_directory END,
                enabled = COALESCE(?, enabled),
                auto_start = COALESCE(?, auto_start),
                health_check_interval_secs = COALESCE(?, health_check_interval_secs),
                files = COALESCE(?, files),
                updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(&patch.command)
        .bind(arguments)
        .bind(set_working_directory)
        .bind(working_directory)
        .bind(patch.enabled)
        .bind(patch.auto_start)
        .bind(interval)
        .bind(files)
        .bind(format_datetime(&Utc::now()))
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }

        if let Some(ref environment) = patch.environment {
            replace_env(&mut tx, id, environment).await?;
        }

        let server = fetch_server(&mut tx, id).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(server)
    }

    async fn update_status(
        &self,
        id: &str,
        record: &RuntimeRecord,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE tool_servers SET status = ?, process_id = ?, last_error = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(record.status.as_str())
        .bind(record.process_id.map(i64::from))
        .bind(&record.last_error)
        .bind(format_datetime(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM tool_server_env WHERE server_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let result = sqlx::query("DELETE FROM tool_servers WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;
    use toolvisor_core::domain::NewServer;

    async fn repo() -> SqliteServerRepository {
        SqliteServerRepository::new(setup_test_database().await.unwrap())
    }

    fn git_server() -> ServerDefinition {
        ServerDefinition::from_new(
            NewServer::new("Git", "uvx")
                .with_id("git-1")
                .with_args(["mcp-server-git", "--repository", "."])
                .with_env("API_KEY", "secret=123")
                .with_file("config/git.toml", "depth = 1\n"),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = repo().await;
        let inserted = repo.insert(git_server()).await.unwrap();

        let fetched = repo.get("git-1").await.unwrap();
        assert_eq!(fetched.arguments, inserted.arguments);
        assert_eq!(fetched.environment["API_KEY"], "secret=123");
        assert_eq!(fetched.files, inserted.files);
        assert_eq!(fetched.status, ServerStatus::Stopped);
        assert_eq!(
            (fetched.created_at - inserted.created_at).num_milliseconds(),
            0
        );
    }

    #[tokio::test]
    async fn test_env_values_are_base64_at_rest() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteServerRepository::new(pool.clone());
        repo.insert(git_server()).await.unwrap();

        let (stored,): (String,) =
            sqlx::query_as("SELECT value FROM tool_server_env WHERE server_id = 'git-1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(stored, encode_env_value("secret=123"));
        assert_ne!(stored, "secret=123");
    }

    #[tokio::test]
    async fn test_conflict_on_duplicate_id() {
        let repo = repo().await;
        repo.insert(git_server()).await.unwrap();
        let result = repo.insert(git_server()).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(id)) if id == "git-1"));
    }

    #[tokio::test]
    async fn test_patch_touches_only_present_fields() {
        let repo = repo().await;
        repo.insert(git_server()).await.unwrap();

        let patch = ServerPatch {
            command: Some("git-mcp".to_string()),
            working_directory: Some(Some("/srv/repo".to_string())),
            environment: Some(BTreeMap::from([("TOKEN".to_string(), "t".to_string())])),
            ..Default::default()
        };
        let updated = repo.update("git-1", &patch).await.unwrap();

        assert_eq!(updated.command, "git-mcp");
        assert_eq!(updated.name, "Git");
        assert_eq!(updated.arguments.len(), 3);
        assert_eq!(updated.working_directory.as_deref(), Some("/srv/repo"));
        assert_eq!(updated.environment.len(), 1);
        assert_eq!(updated.environment["TOKEN"], "t");

        let cleared = repo
            .update(
                "git-1",
                &ServerPatch {
                    working_directory: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.working_directory, None);
        assert_eq!(cleared.command, "git-mcp");
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let repo = repo().await;
        let result = repo.update("ghost", &ServerPatch::default()).await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_status_writes_and_filters() {
        let repo = repo().await;
        repo.insert(git_server()).await.unwrap();

        repo.update_status("git-1", &RuntimeRecord::running(4242))
            .await
            .unwrap();
        let running = repo
            .list(&ServerFilter::with_status(ServerStatus::Running))
            .await
            .unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].process_id, Some(4242));

        repo.update_status("git-1", &RuntimeRecord::failed("exited with status 2"))
            .await
            .unwrap();
        let server = repo.get("git-1").await.unwrap();
        assert_eq!(server.status, ServerStatus::Error);
        assert_eq!(server.process_id, None);
        assert_eq!(server.last_error.as_deref(), Some("exited with status 2"));

        assert!(
            repo.list(&ServerFilter::with_enabled(false))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_delete_removes_env_rows() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteServerRepository::new(pool.clone());
        repo.insert(git_server()).await.unwrap();

        assert!(repo.delete("git-1").await.unwrap());
        assert!(!repo.delete("git-1").await.unwrap());

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tool_server_env")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
