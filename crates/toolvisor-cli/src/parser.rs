//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;
use toolvisor_core::StoreKind;

use crate::commands::Commands;

/// Command-line interface for the tool-server supervisor.
///
/// This is the top-level parser that handles global options and dispatches
/// to subcommands.
#[derive(Parser)]
#[command(name = "toolvisor")]
#[command(about = "Register, launch and supervise local tool servers")]
#[command(version)]
pub struct Cli {
    /// Configuration store backend (memory, file, sqlite)
    #[arg(long, global = true)]
    pub store: Option<StoreKind>,

    /// Location of the store file instead of the data directory default
    #[arg(long = "store-path", global = true)]
    pub store_path: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
