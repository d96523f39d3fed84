//! CLI interface for strike-engine
//!
//! Provides subcommands for:
//! - `run`: Start the production pipeline
//! - `probe`: One-shot probability query
//! - `status`: Report published artifact freshness
//! - `config`: Show the effective configuration

mod probe;
mod run;
mod status;

pub use probe::ProbeArgs;
pub use run::RunArgs;
pub use status::StatusArgs;

use crate::config::Config;
use crate::fingerprint::CsvFingerprintStore;
use crate::probability::ProbabilityEngine;
use anyhow::Context;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "strike-engine")]
#[command(about = "Momentum-bucketed strike probabilities for binary strike markets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the production pipeline
    Run(RunArgs),
    /// Query the engine once
    Probe(ProbeArgs),
    /// Show published artifact freshness
    Status(StatusArgs),
    /// Show configuration
    Config,
}

/// Load the engine for the configured symbol, normalized to lowercase
fn load_engine(config: &Config) -> anyhow::Result<ProbabilityEngine> {
    let symbol = config.market.symbol.to_lowercase();
    let store = CsvFingerprintStore::new(&config.fingerprint.dir);
    ProbabilityEngine::load(&store, &symbol).with_context(|| {
        format!(
            "No usable fingerprint tables for {} in {}",
            symbol,
            config.fingerprint.dir.display()
        )
    })
}
