//! Run command handler.
//!
//! Starts servers, supervises them until Ctrl-C, then stops everything
//! this process launched. Children never outlive the command.

use anyhow::Result;
use tracing::info;

use crate::bootstrap::CliContext;

/// Execute the run command.
///
/// With no ids, starts every enabled auto-start server. Start failures are
/// reported and do not prevent supervising the servers that did start.
pub async fn execute(ctx: &CliContext, ids: &[String]) -> Result<()> {
    let mcp = ctx.mcp();

    if ids.is_empty() {
        let report = mcp.start_all_enabled().await?;
        for name in &report.started {
            println!("Started {name}");
        }
        for failure in &report.failed {
            eprintln!("Failed to start {}: {}", failure.name, failure.error);
        }
    } else {
        for id in ids {
            match mcp.start_server(id).await {
                Ok(pid) => println!("Started {id} (pid {pid})"),
                Err(e) if e.is_invalid_state() => println!("Skipped {id}: {e}"),
                Err(e) => {
                    eprintln!("Failed to start {id}: {e}");
                    if let toolvisor_core::ServiceError::LaunchFailed { ref stderr, .. } = e {
                        if !stderr.is_empty() {
                            eprintln!("{}", stderr.trim_end());
                        }
                    }
                }
            }
        }
    }

    let supervised = mcp.runtime_snapshot().await.len();
    if supervised == 0 {
        println!("No servers running.");
        return Ok(());
    }

    println!("Supervising {supervised} server(s). Press Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, stopping servers");

    let report = mcp.shutdown().await;
    println!("Stopped {} server(s).", report.stopped_count);
    for failure in &report.failed {
        eprintln!("Failed to stop {}: {}", failure.id, failure.error);
    }
    Ok(())
}
