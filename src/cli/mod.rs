//! CLI Module
//!
//! Command-line interface for the rigup provisioning tool.

pub mod commands;

use clap::{Parser, Subcommand};

/// rigup - GPU development machine provisioning for the MultiTalk stack
#[derive(Parser, Debug)]
#[command(name = "rigup")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full provisioning pipeline
    #[command(name = "provision")]
    Provision {
        /// Print the step plan without executing anything
        #[arg(long)]
        dry_run: bool,

        /// Skip the model weight downloads (same as SKIP_WEIGHTS=1)
        #[arg(long)]
        skip_weights: bool,
    },

    /// Create the model directories and download weights only
    #[command(name = "weights")]
    Weights,

    /// Report tool presence, environment state, and GPU capability
    #[command(name = "check")]
    Check,

    /// Print the resolved configuration as JSON
    #[command(name = "print-config")]
    PrintConfig,
}
