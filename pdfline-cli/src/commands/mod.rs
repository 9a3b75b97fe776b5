//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod plan;
mod run;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Run the pipeline (default)
    Run,
    /// Show the stages and their command lines without running anything
    Plan,
}

/// Handle a CLI command
///
/// # Returns
/// The process exit code
pub async fn handle_command(command: Commands, config: &Config) -> Result<i32> {
    match command {
        Commands::Run => run::handle_run_command(config).await,
        Commands::Plan => plan::handle_plan_command(config),
    }
}
