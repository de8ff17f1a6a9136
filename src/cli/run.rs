//! CLI entry-point running every stage in sequence.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    config::Settings,
    data::{normalize, store},
    nlp,
};

/// Args for the `run` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Skip the warehouse load even when WAREHOUSE_URL is set.
    #[arg(long)]
    pub skip_load: bool,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let processed = settings.processed_reviews_path();

    let stats = normalize::run(&settings)
        .await
        .context("normalize stage failed")?;
    info!(rows = stats.written, "normalize stage done");

    nlp::run_sentiment(&settings, &processed, &settings.sentiment_reviews_path())
        .await
        .context("sentiment stage failed")?;

    nlp::run_themes(&settings, &processed, &settings.themed_reviews_path())
        .await
        .context("themes stage failed")?;

    if args.skip_load || settings.warehouse_url.is_none() {
        info!("WAREHOUSE_URL not set or load skipped; leaving warehouse untouched");
        return Ok(());
    }
    store::run(&settings).await.context("load stage failed")?;
    info!("pipeline completed");
    Ok(())
}
