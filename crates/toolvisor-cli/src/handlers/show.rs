//! Show command handler.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::presentation::display_server_details;

/// Execute the show command.
pub async fn execute(ctx: &CliContext, id: &str) -> Result<()> {
    let info = ctx.mcp().get_server(id).await?;
    display_server_details(&info);
    Ok(())
}
