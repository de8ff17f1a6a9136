//! Per bank and rating sentiment roll-ups built with polars.

use std::{fs::File, path::Path};

use anyhow::Result;
use polars::prelude::*;
use tracing::info;

use crate::nlp::sentiment::SentimentReview;

/// Mean sentiment score and review count for every (bank, rating) pair, in
/// first-seen order.
pub fn sentiment_by_bank_rating(reviews: &[SentimentReview]) -> Result<DataFrame> {
    let banks: Vec<String> = reviews.iter().map(|r| r.bank.clone()).collect();
    let ratings: Vec<Option<i64>> = reviews.iter().map(|r| r.rating.map(i64::from)).collect();
    let scores: Vec<f64> = reviews.iter().map(|r| r.sentiment_score).collect();

    let df = DataFrame::new(vec![
        Series::new("bank".into(), banks),
        Series::new("rating".into(), ratings),
        Series::new("sentiment_score".into(), scores),
    ])?;

    let grouped = df
        .lazy()
        .group_by_stable([col("bank"), col("rating")])
        .agg([
            col("sentiment_score").mean().alias("mean_sentiment_score"),
            col("sentiment_score").count().alias("reviews"),
        ])
        .collect()?;
    Ok(grouped)
}

/// Write the roll-up as CSV, creating parent folders as needed.
pub fn write_sentiment_aggregate(reviews: &[SentimentReview], path: &Path) -> Result<()> {
    let mut df = sentiment_by_bank_rating(reviews)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).finish(&mut df)?;
    info!(path = %path.display(), groups = df.height(), "wrote sentiment aggregate");
    Ok(())
}
