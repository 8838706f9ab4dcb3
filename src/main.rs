//! rigup CLI - GPU machine provisioning
//!
//! Command-line interface for provisioning a GPU development machine for the
//! MultiTalk video generation stack.

use clap::Parser;
use env_logger::Env;
use log::info;

use rigup::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("rigup v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("rigup v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Provision {
            dry_run,
            skip_weights,
        } => commands::provision(dry_run, skip_weights),
        Commands::Weights => commands::weights(),
        Commands::Check => commands::check(),
        Commands::PrintConfig => commands::print_config(),
    }
}
