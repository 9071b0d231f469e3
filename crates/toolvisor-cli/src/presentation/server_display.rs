//! Detail and status rendering for a single server.

use toolvisor_core::ServerStatus;
use toolvisor_mcp::McpServerInfo;

/// Effective status with pid, e.g. `running (pid 4242)`.
///
/// A running status this process does not supervise is marked as
/// last-known, since another instance may have written it.
pub fn format_status(info: &McpServerInfo) -> String {
    let mut text = match info.process_id {
        Some(pid) => format!("{} (pid {pid})", info.status),
        None => info.status.to_string(),
    };
    if !info.supervised && info.status == ServerStatus::Running {
        text.push_str(" [last known]");
    }
    text
}

/// Print every field of a server.
pub fn display_server_details(info: &McpServerInfo) {
    let server = &info.server;

    println!("ID:            {}", server.id);
    println!("Name:          {}", server.name);
    if !server.description.is_empty() {
        println!("Description:   {}", server.description);
    }
    println!("Command:       {}", server.command);
    if !server.arguments.is_empty() {
        println!("Arguments:     {}", server.arguments.join(" "));
    }
    println!(
        "Working dir:   {}",
        server
            .working_directory
            .as_deref()
            .unwrap_or("(supervisor's current directory)")
    );
    println!("Enabled:       {}", server.enabled);
    println!("Auto-start:    {}", server.auto_start);
    println!("Health check:  every {}s", server.health_check_interval_secs);
    println!("Status:        {}", format_status(info));
    if let Some(ref error) = server.last_error {
        println!("Last error:    {error}");
    }

    if !server.environment.is_empty() {
        println!("Environment:");
        for (key, value) in &server.environment {
            println!("  {key}={value}");
        }
    }
    if !server.files.is_empty() {
        println!("Files:");
        for file in &server.files {
            println!("  {} ({} bytes)", file.path, file.content.len());
        }
    }

    println!("Created:       {}", server.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Updated:       {}", server.updated_at.format("%Y-%m-%d %H:%M:%S"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use toolvisor_core::{NewServer, ServerDefinition};

    fn info(status: ServerStatus, pid: Option<u32>, supervised: bool) -> McpServerInfo {
        McpServerInfo {
            server: ServerDefinition::from_new(NewServer::new("Git", "git"), Utc::now()),
            status,
            process_id: pid,
            supervised,
        }
    }

    #[test]
    fn test_format_status() {
        assert_eq!(format_status(&info(ServerStatus::Stopped, None, false)), "stopped");
        assert_eq!(
            format_status(&info(ServerStatus::Running, Some(42), true)),
            "running (pid 42)"
        );
        assert_eq!(
            format_status(&info(ServerStatus::Running, Some(42), false)),
            "running (pid 42) [last known]"
        );
    }
}
