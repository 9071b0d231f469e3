//! CLI entry point - the composition root.
//!
//! This is the ONLY place where infrastructure is wired together via bootstrap.
//! Command dispatch routes to handlers which delegate to `McpService`.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use toolvisor_cli::{Cli, CliConfig, Commands, bootstrap, exit_code_for, handlers};

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    // Bootstrap the CLI context (composition root)
    let config = CliConfig::from_env(cli.store, cli.store_path)?;
    let ctx = bootstrap(config).await?;

    match command {
        Commands::Paths => handlers::paths::execute(&ctx)?,
        Commands::List {
            status,
            enabled,
            json,
        } => handlers::list::execute(&ctx, status, enabled, json).await?,
        Commands::Show { id } => handlers::show::execute(&ctx, &id).await?,
        Commands::Add(args) => handlers::add::execute(&ctx, args).await?,
        Commands::Update(args) => handlers::update::execute(&ctx, args).await?,
        Commands::Remove { id } => handlers::remove::execute(&ctx, &id).await?,
        Commands::Status => handlers::status::execute(&ctx).await?,
        Commands::Seed => handlers::seed::execute(&ctx).await?,
        Commands::Run { ids } => handlers::run::execute(&ctx, &ids).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(exit_code_for(&err));
    }
}
