//! CLI module for Relay Cache
//!
//! Subcommands:
//! - `migrate`: apply schema migrations
//! - `ingest-sensitive`: load the phrase blocklist
//! - `ask`: screen a message through the blocklist and cache
//! - `remember`: attach a real answer to a cache entry
//! - `stats`: row counts of every table

pub mod cache;
pub mod migrate;
pub mod sensitive;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging::init_logging;

/// Relay Cache - semantic response cache and vector blocklist
#[derive(Parser)]
#[command(name = "relay-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply database migrations
    Migrate,

    /// Embed and store the sensitive phrase list
    IngestSensitive(IngestArgs),

    /// Screen a message and print the gate decision
    Ask(AskArgs),

    /// Store a generated answer for a cache entry
    Remember(RememberArgs),

    /// Print table row counts
    Stats,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Phrase file, one phrase per line (defaults to sensitive.phrase_file)
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Message text
    pub text: String,
}

#[derive(Args, Debug)]
pub struct RememberArgs {
    /// Cache entry id from a previous `ask`
    #[arg(long)]
    pub entry_id: i64,

    /// Question text
    pub question: String,

    /// Answer text
    pub answer: String,
}

/// Load `.env` and configuration, then install logging
pub fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_logging(&config.logging);

    Ok(config)
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = bootstrap()?;

    match cli.command {
        Command::Migrate => migrate::run(config).await,
        Command::IngestSensitive(args) => sensitive::run(config, args).await,
        Command::Ask(args) => cache::ask(config, args).await,
        Command::Remember(args) => cache::remember(config, args).await,
        Command::Stats => cache::stats(config).await,
    }
}
