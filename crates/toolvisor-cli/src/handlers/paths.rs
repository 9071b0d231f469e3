//! Paths command handler.

use anyhow::Result;
use toolvisor_core::{data_root, database_path, registry_file_path};

use crate::bootstrap::CliContext;

/// Display resolved data locations and the active store.
pub fn execute(ctx: &CliContext) -> Result<()> {
    let store = &ctx.mcp().settings().store;

    println!("Data directory:  {}", data_root()?.display());
    println!("Registry file:   {}", registry_file_path()?.display());
    println!("Database:        {}", database_path()?.display());
    match store.resolved_path()? {
        Some(path) => println!("Active store:    {} ({})", store.kind, path.display()),
        None => println!("Active store:    {}", store.kind),
    }
    Ok(())
}
