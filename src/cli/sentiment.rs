//! CLI entry-point for sentiment scoring.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::{cli::PathArgs, config::Settings, nlp};

/// Args for the `sentiment` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[command(flatten)]
    pub paths: PathArgs,
    /// Override SENTIMENT_MAX_CHARS.
    #[arg(long)]
    pub max_chars: Option<usize>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, mut settings: Settings) -> Result<()> {
    if let Some(max_chars) = args.max_chars {
        settings.sentiment_max_chars = max_chars;
    }
    let (input, output) = args.paths.resolve(
        settings.processed_reviews_path(),
        settings.sentiment_reviews_path(),
    );
    nlp::run_sentiment(&settings, &input, &output).await?;
    Ok(())
}
