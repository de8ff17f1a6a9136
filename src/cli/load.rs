//! CLI entry-point for loading processed reviews into the warehouse.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{config::Settings, data::store};

/// Args for the `load` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Processed reviews CSV; defaults to the normaliser's output.
    #[arg(long)]
    pub input: Option<PathBuf>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let input = args
        .input
        .unwrap_or_else(|| settings.processed_reviews_path());
    let report = store::load_file(&input, &settings)?;
    info!(
        banks_inserted = report.banks_inserted,
        banks_seen = report.banks_seen,
        reviews_inserted = report.reviews_inserted,
        "warehouse load completed"
    );
    Ok(())
}
