mod bootstrap_helpers;
mod bot_runtime;
mod mode_runner;
mod monitor_daemon;

use anyhow::Result;
use clap::Parser;
use triage_cli::{validate_cli, Cli};

use crate::bootstrap_helpers::init_tracing;
use crate::bot_runtime::BotRuntime;
use crate::mode_runner::run_mode;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    validate_cli(&cli)?;
    let runtime = BotRuntime::from_cli(&cli)?;
    run_mode(&runtime, &cli).await
}

#[cfg(test)]
mod tests;
