//! Command handlers that delegate to the tool-server service.
//!
//! Handlers follow the canonical pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Thin wrappers that:
//!   1. Parse/validate CLI-specific input
//!   2. Call `McpService` methods
//!   3. Format output for the terminal
//!
//! Handlers should NOT:
//! - Access the store directly
//! - Contain lifecycle logic

pub mod add;
pub mod list;
pub mod paths;
pub mod remove;
pub mod run;
pub mod seed;
pub mod show;
pub mod status;
pub mod update;
