//! appfetch - application bundle acquisition
//!
//! CLI entry point that dispatches to subcommands.

use appfetch::cli::{Cli, Commands};
use appfetch::config::ConfigManager;
use appfetch::error::AppfetchResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> AppfetchResult<()> {
    let cli = Cli::parse();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    // 0 = warn, 1 = info, 2+ = debug; the config file can raise 0 to info
    let verbosity = match cli.verbose {
        0 if config.general.verbose => 1,
        v => v,
    };
    let filter = match verbosity {
        0 => EnvFilter::new("appfetch=warn"),
        1 => EnvFilter::new("appfetch=info"),
        _ => EnvFilter::new("appfetch=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }
    debug!("Loaded configuration from {}", config_manager.path().display());

    match cli.command {
        Commands::Fetch(args) => appfetch::cli::commands::fetch(args, &config).await,
        Commands::Config(args) => {
            appfetch::cli::commands::config(args, &config_manager, &config).await
        }
    }
}
