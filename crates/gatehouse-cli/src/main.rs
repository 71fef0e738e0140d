//! Gatehouse CLI entry point.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use gatehouse_core::config::{AppConfig, LoggingConfig};

mod commands;
mod output;

use commands::Cli;

fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => fmt().json().with_env_filter(filter).with_target(true).init(),
        _ => fmt().pretty().with_env_filter(filter).with_target(true).init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load config: {e}");
            std::process::exit(1);
        }
    };
    init_logging(&config.logging);

    if let Err(e) = cli.execute(&config).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
