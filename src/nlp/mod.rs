//! Natural language processing orchestration layer.

pub mod keywords;
#[cfg(feature = "onx")]
pub mod onnx;
pub mod sentiment;
pub mod themes;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    config::Settings,
    data::{
        aggregate, io,
        record::{CleanReview, OUTPUT_COLUMNS},
    },
};

use self::{
    keywords::KeywordExtractor,
    sentiment::SentimentSummary,
    themes::ThemeTable,
};

/// Score every processed review and write the annotated file plus the
/// per bank and rating roll-up.
pub async fn run_sentiment(
    settings: &Settings,
    input: &Path,
    output: &Path,
) -> Result<SentimentSummary> {
    let reviews: Vec<CleanReview> =
        io::read_rows(input, &OUTPUT_COLUMNS).context("reading processed reviews")?;
    info!(input = %input.display(), reviews = reviews.len(), "starting sentiment analysis");

    let scorer = sentiment::load_scorer(settings).context("loading sentiment scorer")?;
    let annotated = sentiment::annotate(
        scorer,
        reviews,
        settings.sentiment_max_chars,
        settings.sentiment_concurrency,
    )
    .await;

    io::save(&annotated, output).context("saving sentiment output")?;
    aggregate::write_sentiment_aggregate(&annotated, &settings.sentiment_aggregate_path())
        .context("writing sentiment aggregate")?;

    let summary = SentimentSummary::tally(&annotated);
    sentiment::log_summary(&summary);
    Ok(summary)
}

/// Extract keywords, assign themes and write the thematic analysis file.
pub async fn run_themes(settings: &Settings, input: &Path, output: &Path) -> Result<usize> {
    let reviews: Vec<CleanReview> =
        io::read_rows(input, &OUTPUT_COLUMNS).context("reading processed reviews")?;
    info!(input = %input.display(), reviews = reviews.len(), "starting thematic analysis");

    let table = match &settings.theme_table {
        Some(path) => ThemeTable::from_json_file(path).context("loading theme table")?,
        None => ThemeTable::default(),
    };
    let extractor = KeywordExtractor::new(settings.keyword_top_n, settings.keyword_max_features);
    let themed = themes::annotate_themes(reviews, &extractor, &table);

    io::save(&themed, output).context("saving thematic analysis")?;
    info!(output = %output.display(), rows = themed.len(), "thematic analysis completed");
    Ok(themed.len())
}
