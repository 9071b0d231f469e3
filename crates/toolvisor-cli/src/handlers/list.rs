//! List command handler.
//!
//! Displays registered servers in a formatted table.

use anyhow::Result;
use toolvisor_core::{ServerFilter, ServerStatus};

use crate::bootstrap::CliContext;
use crate::presentation::{format_status, print_separator, truncate_string};

/// Execute the list command.
///
/// # Errors
///
/// This function will return an error if the store cannot be read.
pub async fn execute(
    ctx: &CliContext,
    status: Option<ServerStatus>,
    enabled: Option<bool>,
    json: bool,
) -> Result<()> {
    let filter = ServerFilter { status, enabled };
    let servers = ctx.mcp().list_servers(&filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&servers)?);
        return Ok(());
    }

    if servers.is_empty() {
        println!("No servers found.");
        println!("Use 'toolvisor add' to register one, or 'toolvisor seed' for the defaults.");
        return Ok(());
    }

    println!("Found {} server(s):\n", servers.len());
    println!(
        "{:<20} {:<24} {:<16} {:<8} {:<6} Status",
        "ID", "Name", "Command", "Enabled", "Auto"
    );
    print_separator(100);

    for info in &servers {
        println!(
            "{:<20} {:<24} {:<16} {:<8} {:<6} {}",
            truncate_string(&info.server.id, 19),
            truncate_string(&info.server.name, 23),
            truncate_string(&info.server.command, 15),
            if info.server.enabled { "yes" } else { "no" },
            if info.server.auto_start { "yes" } else { "no" },
            format_status(info)
        );
    }

    Ok(())
}
