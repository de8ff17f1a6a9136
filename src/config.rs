//! Runtime configuration utilities for bank-reviews.

use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

use crate::data::normalize::RatingPolicy;

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Root folder for raw and processed review files.
    pub data_dir: PathBuf,
    /// Root folder for analytic outputs.
    pub outputs_dir: PathBuf,
    /// Scraped reviews consumed by `normalize`, relative to `data_dir`.
    pub raw_reviews_file: PathBuf,
    /// How absent ratings are treated during repair.
    pub rating_policy: RatingPolicy,
    /// Characters of review text handed to the sentiment scorer.
    pub sentiment_max_chars: usize,
    /// Reviews scored concurrently.
    pub sentiment_concurrency: usize,
    /// Directory holding `model.onnx` and `tokenizer.json` for the ONNX scorer.
    pub sentiment_model_dir: Option<PathBuf>,
    /// Keywords kept per review.
    pub keyword_top_n: usize,
    /// Vocabulary cap for keyword extraction.
    pub keyword_max_features: usize,
    /// Optional JSON file overriding the keyword to theme table.
    pub theme_table: Option<PathBuf>,
    /// Warehouse connection string; only ever read from the environment.
    #[serde(skip)]
    pub warehouse_url: Option<String>,
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let outputs_dir = env::var("OUTPUTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./outputs"));

        let mut settings = Self::with_dirs(data_dir, outputs_dir);
        if let Ok(file) = env::var("RAW_REVIEWS_FILE") {
            settings.raw_reviews_file = PathBuf::from(file);
        }
        if let Ok(policy) = env::var("RATING_POLICY") {
            settings.rating_policy = policy
                .parse()
                .with_context(|| format!("parsing RATING_POLICY={policy}"))?;
        }
        settings.sentiment_max_chars = env_number("SENTIMENT_MAX_CHARS", 512);
        settings.sentiment_concurrency = env_number("SENTIMENT_CONCURRENCY", 4).max(1);
        settings.sentiment_model_dir = env::var("SENTIMENT_MODEL_DIR").ok().map(PathBuf::from);
        settings.keyword_top_n = env_number("KEYWORD_TOP_N", 5);
        settings.keyword_max_features = env_number("KEYWORD_MAX_FEATURES", 1000);
        settings.theme_table = env::var("THEME_TABLE").ok().map(PathBuf::from);
        settings.warehouse_url = env::var("WAREHOUSE_URL").ok();

        std::fs::create_dir_all(&settings.data_dir).context("creating data dir")?;
        std::fs::create_dir_all(&settings.outputs_dir).context("creating outputs dir")?;

        Ok(settings)
    }

    /// Defaults rooted at the given folders, without touching the environment.
    pub fn with_dirs(data_dir: impl Into<PathBuf>, outputs_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            outputs_dir: outputs_dir.into(),
            raw_reviews_file: PathBuf::from("cleaned_reviews.csv"),
            rating_policy: RatingPolicy::default(),
            sentiment_max_chars: 512,
            sentiment_concurrency: 4,
            sentiment_model_dir: None,
            keyword_top_n: 5,
            keyword_max_features: 1000,
            theme_table: None,
            warehouse_url: None,
        }
    }

    /// Convenience helper for derived path segments.
    pub fn join_data<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.data_dir.join(path)
    }

    /// Convenience helper for derived output path segments.
    pub fn join_output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.outputs_dir.join(path)
    }

    pub fn raw_reviews_path(&self) -> PathBuf {
        self.join_data(&self.raw_reviews_file)
    }

    pub fn processed_reviews_path(&self) -> PathBuf {
        self.join_data("processed_reviews.csv")
    }

    pub fn sentiment_reviews_path(&self) -> PathBuf {
        self.join_data("reviews_with_sentiment.csv")
    }

    pub fn themed_reviews_path(&self) -> PathBuf {
        self.join_data("thematic_analysis_output.csv")
    }

    pub fn sentiment_aggregate_path(&self) -> PathBuf {
        self.join_output("sentiment_aggregate_by_bank_rating.csv")
    }
}

fn env_number(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
