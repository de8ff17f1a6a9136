//! CLI entry-point for review normalisation.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    cli::PathArgs,
    config::Settings,
    data::normalize::{self, RatingPolicy},
};

/// Args for the `normalize` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[command(flatten)]
    pub paths: PathArgs,
    /// Override RATING_POLICY (clamp or preserve-missing).
    #[arg(long)]
    pub rating_policy: Option<RatingPolicy>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let (input, output) = args
        .paths
        .resolve(settings.raw_reviews_path(), settings.processed_reviews_path());
    let policy = args.rating_policy.unwrap_or(settings.rating_policy);
    let stats = normalize::normalize_file(&input, &output, policy)?;
    info!(output = %output.display(), rows = stats.written, "processed reviews written");
    Ok(())
}
