//! Default server catalogue inserted by `seed_defaults`.
//!
//! None of these auto-start. They run from the manager's current directory
//! unless an operator sets one.

use toolvisor_core::NewServer;

/// The default tool servers, each with a fixed id.
pub fn default_servers(health_check_interval_secs: u64) -> Vec<NewServer> {
    vec![
        NewServer::new("File System Server", "npx")
            .with_id("filesystem-1")
            .with_description("Local file system operations (list, read, search)")
            .with_args(["-y", "@modelcontextprotocol/server-filesystem", "."]),
        NewServer::new("Database Server", "npx")
            .with_id("database-1")
            .with_description("Database query and management tools")
            .with_args(["-y", "@modelcontextprotocol/server-postgres"])
            .with_env("DATABASE_URL", "sqlite:///chatbot.db"),
        NewServer::new("Git Server", "npx")
            .with_id("git-1")
            .with_description("Git repository operations and file version control")
            .with_args(["-y", "@modelcontextprotocol/server-git"]),
        NewServer::new("Web Fetch Server", "npx")
            .with_id("web-fetch-1")
            .with_description("Web content fetching and HTTP requests")
            .with_args(["-y", "@modelcontextprotocol/server-fetch"]),
    ]
    .into_iter()
    .map(|server| {
        server
            .with_auto_start(false)
            .with_health_check_interval(health_check_interval_secs)
    })
    .collect()
}
