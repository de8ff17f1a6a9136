//! CLI entry-point for keyword extraction and theme assignment.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::{cli::PathArgs, config::Settings, nlp};

/// Args for the `themes` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[command(flatten)]
    pub paths: PathArgs,
    /// Override KEYWORD_TOP_N.
    #[arg(long)]
    pub top_n: Option<usize>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, mut settings: Settings) -> Result<()> {
    if let Some(top_n) = args.top_n {
        settings.keyword_top_n = top_n;
    }
    let (input, output) = args.paths.resolve(
        settings.processed_reviews_path(),
        settings.themed_reviews_path(),
    );
    nlp::run_themes(&settings, &input, &output).await?;
    Ok(())
}
