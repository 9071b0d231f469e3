//! Remove command handler.
//!
//! Removes a server from the registry. Servers are stopped first when
//! this process supervises them.

use anyhow::Result;

use crate::bootstrap::CliContext;

/// Execute the remove command.
///
/// # Errors
///
/// This function will return an error if:
/// - No server has this id
/// - The store cannot be written
pub async fn execute(ctx: &CliContext, id: &str) -> Result<()> {
    let info = ctx.mcp().get_server(id).await?;
    ctx.mcp().remove_server(id).await?;
    println!("Server '{}' ({id}) removed.", info.server.name);
    Ok(())
}
