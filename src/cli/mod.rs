//! Command-line interface wiring for bank-reviews.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Settings;

pub mod load;
pub mod normalize;
pub mod run;
pub mod sentiment;
pub mod themes;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Bank app review pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Normalize(args) => normalize::run(args, settings).await,
            Commands::Sentiment(args) => sentiment::run(args, settings).await,
            Commands::Themes(args) => themes::run(args, settings).await,
            Commands::Load(args) => load::run(args, settings).await,
            Commands::Run(args) => run::run(args, settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Deduplicate, repair and canonicalise the raw review dump.
    Normalize(normalize::Args),
    /// Score processed reviews and aggregate sentiment per bank and rating.
    Sentiment(sentiment::Args),
    /// Extract keywords and group them into themes.
    Themes(themes::Args),
    /// Load processed reviews into the warehouse.
    Load(load::Args),
    /// Run every stage in order, stopping at the first failure.
    Run(run::Args),
}

/// Input/output overrides shared by the file-to-file commands.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PathArgs {
    /// Read from this CSV instead of the configured location.
    #[arg(long)]
    pub input: Option<PathBuf>,
    /// Write to this CSV instead of the configured location.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl PathArgs {
    pub fn resolve(&self, input: PathBuf, output: PathBuf) -> (PathBuf, PathBuf) {
        (
            self.input.clone().unwrap_or(input),
            self.output.clone().unwrap_or(output),
        )
    }
}
