//! cutover — zero-downtime blue-green deployments.
//!
//! # Usage
//!
//! ```text
//! cutover --config /srv/api/cutover.toml deploy 3f9c2ab
//! cutover deploy v1.4.1 --rollback
//! cutover status
//! cutover history --limit 5
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "cutover",
    about = "Blue-green deployments for compose stacks behind a reverse proxy",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to cutover.toml. Relative paths inside it resolve against its
    /// directory.
    #[arg(short, long, global = true, default_value = "cutover.toml")]
    config: PathBuf,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a version to the idle slot and switch traffic to it.
    Deploy {
        /// Commit hash or release tag to deploy.
        #[arg(id = "deploy_version", value_name = "VERSION")]
        version: String,
        /// Mark this run as a rollback (set by the generated rollback script).
        #[arg(long)]
        rollback: bool,
    },
    /// Show which slot is live and what it runs.
    Status,
    /// Print the most recent deployment ledger entries.
    History {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,cutover=debug"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    match cli.command {
        Commands::Deploy { version, rollback } => {
            commands::deploy::deploy(&cli.config, &version, rollback).await
        }
        Commands::Status => commands::status::status(&cli.config),
        Commands::History { limit } => commands::history::history(&cli.config, limit),
    }
}
