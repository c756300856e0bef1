// server/src/cli/cli.rs

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use lib::load_config;

use super::commands::{CliArgs, PrectaCommand};
use super::handlers::{handle_config, handle_migrate, handle_serve};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

/// CLI entry point for precta.
pub async fn start_cli() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command.unwrap_or(PrectaCommand::Serve { port: None, host: None }) {
        PrectaCommand::Serve { port, host } => handle_serve(config, port, host).await,
        PrectaCommand::Migrate => handle_migrate(config).await,
        PrectaCommand::Config => handle_config(&config),
    }
}
