//! Update command handler.

use std::collections::BTreeMap;

use anyhow::Result;
use toolvisor_core::ServerPatch;

use crate::bootstrap::CliContext;
use crate::commands::UpdateArgs;
use crate::presentation::format_status;

/// Translate update flags into a patch. Absent flags leave fields untouched.
pub fn build_patch(args: &UpdateArgs) -> ServerPatch {
    let arguments = if args.clear_args {
        Some(Vec::new())
    } else if args.args.is_empty() {
        None
    } else {
        Some(args.args.clone())
    };

    let environment = if args.clear_env {
        Some(BTreeMap::new())
    } else if args.env.is_empty() {
        None
    } else {
        Some(args.env.iter().cloned().collect())
    };

    let working_directory = if args.clear_cwd {
        Some(None)
    } else {
        args.cwd.clone().map(Some)
    };

    let enabled = if args.enable {
        Some(true)
    } else if args.disable {
        Some(false)
    } else {
        None
    };

    ServerPatch {
        name: args.name.clone(),
        description: args.description.clone(),
        command: args.command.clone(),
        arguments,
        environment,
        working_directory,
        enabled,
        auto_start: args.auto_start,
        health_check_interval_secs: args.interval,
        files: None,
    }
}

/// Execute the update command.
pub async fn execute(ctx: &CliContext, args: UpdateArgs) -> Result<()> {
    let patch = build_patch(&args);
    if patch.is_empty() {
        println!("Nothing to update.");
        return Ok(());
    }

    let info = ctx.mcp().update_server(&args.id, patch).await?;
    println!(
        "Server '{}' ({}) updated, status {}.",
        info.server.name,
        info.server.id,
        format_status(&info)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use crate::commands::Commands;
    use clap::Parser;

    fn update_args(argv: &[&str]) -> UpdateArgs {
        let mut full = vec!["toolvisor", "update", "git-1"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Some(Commands::Update(args)) => args,
            _ => panic!("expected update"),
        }
    }

    #[test]
    fn test_no_flags_is_empty_patch() {
        assert!(build_patch(&update_args(&[])).is_empty());
    }

    #[test]
    fn test_flags_map_to_patch_fields() {
        let patch = build_patch(&update_args(&[
            "--name",
            "Git",
            "--arg",
            "-y",
            "--arg",
            "server-git",
            "--env",
            "A=1",
            "--disable",
            "--auto-start",
            "false",
        ]));

        assert_eq!(patch.name.as_deref(), Some("Git"));
        assert_eq!(
            patch.arguments,
            Some(vec!["-y".to_string(), "server-git".to_string()])
        );
        assert_eq!(patch.environment.unwrap()["A"], "1");
        assert_eq!(patch.enabled, Some(false));
        assert_eq!(patch.auto_start, Some(false));
        assert_eq!(patch.working_directory, None);
    }

    #[test]
    fn test_clear_flags() {
        let patch = build_patch(&update_args(&["--clear-cwd", "--clear-env", "--clear-args"]));
        assert_eq!(patch.working_directory, Some(None));
        assert_eq!(patch.environment, Some(BTreeMap::new()));
        assert_eq!(patch.arguments, Some(Vec::new()));
    }
}
