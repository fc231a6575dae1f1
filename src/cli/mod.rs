//! Operator command-line front end: run a single task end-to-end from a
//! JSON file, or validate a config file. Not the chat transport.

mod check_config;
pub mod output;
mod run_task;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

#[derive(Parser, Debug)]
#[command(name = "ozon-slot-engine")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single task to completion, loading it from a JSON file.
    Run(RunArgs),
    /// Validate a config file and print the resolved settings.
    CheckConfig(CheckConfigArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the config TOML file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
    /// Path to the task JSON file.
    #[arg(short, long)]
    pub task: PathBuf,
}

#[derive(Parser, Debug)]
pub struct CheckConfigArgs {
    /// Path to the config TOML file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run_task::execute(&args.config, &args.task).await,
        Commands::CheckConfig(args) => check_config::execute(&args.config),
    }
}
