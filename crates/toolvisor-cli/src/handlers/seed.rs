//! Seed command handler.

use anyhow::Result;

use crate::bootstrap::CliContext;

/// Execute the seed command.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let inserted = ctx.mcp().seed_defaults().await?;

    if inserted.is_empty() {
        println!("Default servers are already registered.");
    } else {
        println!("Registered {} default server(s):", inserted.len());
        for id in &inserted {
            println!("  {id}");
        }
        println!("None of them auto-start; enable with 'toolvisor update <id> --auto-start true'.");
    }
    Ok(())
}
