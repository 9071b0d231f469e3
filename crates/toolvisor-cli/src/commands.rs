//! Main commands enum and primary subcommands.
//!
//! This module defines the available commands for the CLI tool.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use toolvisor_core::ServerStatus;

/// Available commands for the tool-server supervisor.
#[derive(Subcommand)]
pub enum Commands {
    /// Show resolved paths for the data directory and stores
    Paths,

    /// List registered servers
    List {
        /// Only servers with this status
        #[arg(long)]
        status: Option<ServerStatus>,
        /// Only enabled (true) or disabled (false) servers
        #[arg(long)]
        enabled: Option<bool>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one server in detail
    Show {
        /// Server id
        id: String,
    },

    /// Register a new server
    Add(AddArgs),

    /// Change fields of a registered server
    Update(UpdateArgs),

    /// Remove a server from the registry
    Remove {
        /// Server id
        id: String,
    },

    /// Show status counts across the registry
    Status,

    /// Insert the default server catalogue
    Seed,

    /// Start servers and supervise them until Ctrl-C
    Run {
        /// Servers to start; defaults to every enabled auto-start server
        #[arg(long = "id")]
        ids: Vec<String>,
    },
}

/// Arguments for `add`.
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Display name
    #[arg(long)]
    pub name: String,

    /// Fixed id (a UUID is generated otherwise)
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Environment override, KEY=VALUE (repeatable)
    #[arg(long = "env", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Absolute working directory
    #[arg(long)]
    pub cwd: Option<String>,

    /// Auxiliary file to provision, DEST=LOCAL_SOURCE (repeatable)
    #[arg(long = "file", value_parser = parse_file_mapping)]
    pub files: Vec<(String, PathBuf)>,

    /// Register the server disabled
    #[arg(long)]
    pub disabled: bool,

    /// Start the server on `run`
    #[arg(long)]
    pub auto_start: bool,

    /// Health check interval in seconds
    #[arg(long)]
    pub interval: Option<u64>,

    /// Executable name or path
    pub command: String,

    /// Arguments passed to the executable
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Arguments for `update`. Only given options are changed.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Server id
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub command: Option<String>,

    /// Replace the argument list (repeatable)
    #[arg(long = "arg", allow_hyphen_values = true, conflicts_with = "clear_args")]
    pub args: Vec<String>,

    /// Remove all arguments
    #[arg(long)]
    pub clear_args: bool,

    /// Replace the environment overrides, KEY=VALUE (repeatable)
    #[arg(long = "env", value_parser = parse_key_value, conflicts_with = "clear_env")]
    pub env: Vec<(String, String)>,

    /// Remove all environment overrides
    #[arg(long)]
    pub clear_env: bool,

    #[arg(long, conflicts_with = "clear_cwd")]
    pub cwd: Option<String>,

    /// Run from the supervisor's current directory
    #[arg(long)]
    pub clear_cwd: bool,

    #[arg(long, conflicts_with = "disable")]
    pub enable: bool,

    /// Disable the server, stopping it if running
    #[arg(long)]
    pub disable: bool,

    #[arg(long)]
    pub auto_start: Option<bool>,

    #[arg(long)]
    pub interval: Option<u64>,
}

/// Parse `KEY=VALUE`. The value may itself contain `=`.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

fn parse_file_mapping(raw: &str) -> Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((dest, source)) if !dest.is_empty() && !source.is_empty() => {
            Ok((dest.to_string(), PathBuf::from(source)))
        }
        _ => Err(format!("expected DEST=LOCAL_SOURCE, got '{raw}'")),
    }
}
