//! Recast CLI: the main entry point.
//!
//! Commands:
//! - `generate`: run one prompt against the open file or the repository
//! - `session`: prompt repeatedly, reusing the context cache
//! - `models`: list configured models
//! - `config`: show the effective or default configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

#[derive(Parser)]
#[command(
    name = "recast",
    about = "Recast: code-aware generation with Vertex AI",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace root that include patterns resolve against
    #[arg(short, long, global = true, default_value = ".")]
    workspace: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one prompt and save the response as markdown
    Generate(commands::generate::GenerateArgs),

    /// Interactive prompt loop sharing one context cache
    Session(commands::session::SessionArgs),

    /// List the models offered in configuration
    Models,

    /// Show configuration
    Config {
        /// Print the built-in defaults as TOML instead
        #[arg(long)]
        default: bool,

        /// Print the path of the config file in use
        #[arg(long, conflicts_with = "default")]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Generate(args) => commands::generate::run(&cli.workspace, args).await?,
        Commands::Session(args) => commands::session::run(&cli.workspace, args).await?,
        Commands::Models => commands::models::run(&cli.workspace).await?,
        Commands::Config { default, path } => {
            if default {
                commands::config_cmd::show_default().await?
            } else if path {
                commands::config_cmd::path(&cli.workspace).await?
            } else {
                commands::config_cmd::show(&cli.workspace).await?
            }
        }
    }

    Ok(())
}
