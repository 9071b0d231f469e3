//! Add command handler.

use anyhow::Result;
use toolvisor_core::NewServer;

use crate::bootstrap::CliContext;
use crate::commands::AddArgs;
use crate::error::CliError;

/// Build the add payload, reading auxiliary file contents from disk.
pub fn build_new_server(args: AddArgs, default_interval: u64) -> Result<NewServer, CliError> {
    let mut server = NewServer::new(args.name, args.command)
        .with_description(args.description)
        .with_args(args.args)
        .with_enabled(!args.disabled)
        .with_auto_start(args.auto_start)
        .with_health_check_interval(args.interval.unwrap_or(default_interval));

    if let Some(id) = args.id {
        server = server.with_id(id);
    }
    if let Some(cwd) = args.cwd {
        server = server.with_working_dir(cwd);
    }
    for (key, value) in args.env {
        server = server.with_env(key, value);
    }
    for (dest, source) in args.files {
        let content = std::fs::read_to_string(&source).map_err(|e| {
            CliError::Arguments(format!("cannot read {}: {e}", source.display()))
        })?;
        server = server.with_file(dest, content);
    }

    Ok(server)
}

/// Execute the add command.
pub async fn execute(ctx: &CliContext, args: AddArgs) -> Result<()> {
    let default_interval = ctx.mcp().settings().default_health_check_interval_secs;
    let new_server = build_new_server(args, default_interval)?;
    let server = ctx.mcp().add_server(new_server).await?;

    println!("Server '{}' registered with id {}.", server.name, server.id);
    if server.auto_start {
        println!("It will start on 'toolvisor run'.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use crate::commands::Commands;
    use clap::Parser;

    fn add_args(argv: &[&str]) -> AddArgs {
        let mut full = vec!["toolvisor", "add"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Some(Commands::Add(args)) => args,
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_file_contents_are_read() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("config.toml");
        std::fs::write(&source, "key = 1\n").unwrap();
        let mapping = format!("conf/config.toml={}", source.display());

        let args = add_args(&["--name", "A", "--file", &mapping, "cat"]);
        let server = build_new_server(args, 30).unwrap();

        assert_eq!(server.files.len(), 1);
        assert_eq!(server.files[0].path, "conf/config.toml");
        assert_eq!(server.files[0].content, "key = 1\n");
        assert_eq!(server.health_check_interval_secs, 30);
    }

    #[test]
    fn test_unreadable_source_is_argument_error() {
        let args = add_args(&["--name", "A", "--file", "x.txt=/nonexistent/source", "cat"]);
        let err = build_new_server(args, 30).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_disabled_flag() {
        let args = add_args(&["--name", "A", "--disabled", "--interval", "5", "cat"]);
        let server = build_new_server(args, 30).unwrap();
        assert!(!server.enabled);
        assert_eq!(server.health_check_interval_secs, 5);
    }
}
