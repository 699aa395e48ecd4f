//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// appfetch - resolve application bundles from paths or URLs
///
/// Downloads, unpacks and caches application packages so repeated
/// requests for the same source reuse the same local bundle.
#[derive(Parser, Debug)]
#[command(name = "appfetch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "APPFETCH_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve descriptors to local application bundles
    Fetch(FetchArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Local paths or http(s) URLs of applications
    #[arg(required = true)]
    pub descriptors: Vec<String>,

    /// Supported bundle extensions (e.g. .apk, .app)
    #[arg(short, long = "ext", required = true, value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Delete every cached artifact before exiting
    #[arg(long)]
    pub sweep: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}
