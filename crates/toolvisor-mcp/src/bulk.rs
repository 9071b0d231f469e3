//! Bulk start and stop across the registry.
//!
//! Each server is handled concurrently and independently. One failure never
//! aborts the others; failures are collected into the report.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use toolvisor_core::{ServerFilter, ServerStatus, ServiceError};
use tracing::{info, warn};

use crate::service::McpService;

/// A server that failed to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of `start_all_enabled`, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkStartReport {
    /// Names of servers that started
    pub started: Vec<String>,
    pub failed: Vec<StartFailure>,
}

/// A supervised server that failed to stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopFailure {
    pub id: String,
    pub error: String,
}

/// Outcome of `stop_all`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkStopReport {
    pub stopped_count: usize,
    pub failed: Vec<StopFailure>,
}

impl McpService {
    /// Start every enabled auto-start server that is not already running.
    pub async fn start_all_enabled(&self) -> Result<BulkStartReport, ServiceError> {
        let candidates: Vec<_> = self
            .list_servers(&ServerFilter::with_enabled(true))
            .await?
            .into_iter()
            .filter(|info| info.server.auto_start && info.status != ServerStatus::Running)
            .map(|info| info.server)
            .collect();

        let outcomes = join_all(candidates.iter().map(|server| self.start_server(&server.id))).await;

        let mut report = BulkStartReport::default();
        for (server, outcome) in candidates.into_iter().zip(outcomes) {
            match outcome {
                Ok(_) => report.started.push(server.name),
                Err(e) => {
                    warn!(server_id = %server.id, server_name = %server.name, error = %e, "Failed to auto-start server");
                    report.failed.push(StartFailure {
                        name: server.name,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            started = report.started.len(),
            failed = report.failed.len(),
            "Bulk start finished"
        );
        Ok(report)
    }

    /// Stop every server this instance supervises.
    pub async fn stop_all(&self) -> BulkStopReport {
        let ids = self.manager.supervised_ids().await;
        let outcomes = join_all(ids.iter().map(|id| self.stop_server(id))).await;

        let mut report = BulkStopReport::default();
        for (id, outcome) in ids.into_iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.stopped_count += 1,
                // Died or was stopped between the snapshot and the stop
                Err(ServiceError::AlreadyStopped(_)) => {}
                Err(e) => {
                    warn!(server_id = %id, error = %e, "Failed to stop server");
                    report.failed.push(StopFailure {
                        id,
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }
}
