//! ttlkv CLI binary
//!
//! One-shot typed, TTL-aware commands against a Redis-compatible store

use clap::Parser;
use ttlkv::cli::{run_command, Cli, Commands};
use ttlkv::config::LOG_LEVEL_ENV;
use ttlkv::logging::init_logging;
use ttlkv::TtlClient;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    // Less verbose for CLI unless a level was asked for explicitly
    let mut logging = config.logging.clone();
    if std::env::var(LOG_LEVEL_ENV).is_err() {
        logging.level = "warn".to_string();
    }
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let client = TtlClient::new(&config);
    match run_command(&client, &cli.command).await {
        Ok(output) => {
            println!("{output}");
            if matches!(cli.command, Commands::Ping) && output != "PONG" {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("Command failed against {}: {}", config.store.address(), e);
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
