//! IPTV CLI - Playlist inspection and stream checking
//!
//! Features:
//! - Playlist summary (channels, groups, stream kinds, EPG)
//! - Playlist validation
//! - Channel listing with group filter
//! - Stream reachability and quality ladder checks

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod output;

/// IPTV CLI - M3U playlist toolkit
#[derive(Parser)]
#[command(name = "iptv-cli")]
#[command(version)]
#[command(about = "Inspect, validate and probe IPTV playlists", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a playlist
    Inspect {
        /// URL or path to playlist
        source: String,
    },

    /// Check that a playlist loads and has channels
    Validate {
        /// URL or path to playlist
        source: String,
    },

    /// List channels
    Channels {
        /// URL or path to playlist
        source: String,

        /// Only channels in this group
        #[arg(short, long)]
        group: Option<String>,

        /// Maximum number of channels to list
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Probe channel streams
    Check {
        /// URL or path to playlist
        source: String,

        /// Only channels in this group
        #[arg(short, long)]
        group: Option<String>,

        /// Maximum number of channels to probe
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Concurrent requests
        #[arg(short = 'j', long, default_value = "4")]
        concurrency: usize,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    iptv_core::init();
    let config = config::CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect { source } => {
            commands::inspect(&config, &source, &cli.format).await?;
        }
        Commands::Validate { source } => {
            commands::validate(&config, &source, &cli.format).await?;
        }
        Commands::Channels { source, group, limit } => {
            commands::channels(&config, &source, group.as_deref(), limit, &cli.format).await?;
        }
        Commands::Check { source, group, limit, concurrency } => {
            commands::check(&config, &source, group.as_deref(), limit, concurrency, &cli.format)
                .await?;
        }
        Commands::Config => {
            println!("{}", output::format_output(&config, "json"));
        }
    }

    Ok(())
}
