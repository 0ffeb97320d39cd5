//! # bangle CLI
//!
//! Command-line front end for the bangle store.

use anyhow::Context;
use bangle_cli::commands;
use bangle_cli::AppConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "bangle")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, env = "BANGLE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a file wsPath into its parts
    Resolve {
        /// wsPath such as `my-ws:notes/today.md`
        ws_path: String,
    },

    /// Check that a wsPath is well formed
    Validate {
        ws_path: String,

        /// Also require a note extension
        #[arg(long)]
        note: bool,
    },

    /// List a workspace through a window and worker store pair
    Sync {
        /// Directory holding one folder per workspace
        #[arg(long)]
        root: Option<PathBuf>,

        /// Workspace to open
        #[arg(long)]
        ws: String,

        /// Give up after this many milliseconds
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::WARN.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Resolve { ws_path } => commands::resolve_ws_path(&ws_path),
        Commands::Validate { ws_path, note } => commands::validate_ws_path(&ws_path, note),
        Commands::Sync {
            root,
            ws,
            timeout_ms,
            json,
        } => {
            let config =
                AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
            let opts = commands::SyncOptions {
                root,
                ws_name: ws,
                timeout: Duration::from_millis(timeout_ms),
                json,
            };
            commands::sync_workspace(&config, opts).await
        }
    }
}
