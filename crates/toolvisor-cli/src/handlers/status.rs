//! Status command handler.

use anyhow::Result;

use crate::bootstrap::CliContext;

/// Execute the status command.
///
/// Counts are based on the statuses last written to the store; this
/// one-shot process supervises nothing itself.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let summary = ctx.mcp().status_summary().await?;

    println!("Servers:   {}", summary.total);
    println!("Enabled:   {}", summary.enabled);
    println!("Running:   {}", summary.running);
    println!("Starting:  {}", summary.starting);
    println!("Stopped:   {}", summary.stopped);
    println!("Error:     {}", summary.error);
    Ok(())
}
