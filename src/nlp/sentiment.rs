//! Review sentiment scoring with a per-review neutral fallback.

use std::{cmp::Ordering, collections::HashSet, fmt, path::Path, sync::Arc};

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::Settings,
    data::record::{CleanReview, Tabular},
    error::{PipelineError, Result},
};

/// Polarity vocabulary shared by every scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        };
        f.write_str(label)
    }
}

/// Label plus confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentimentScore {
    pub label: SentimentLabel,
    pub score: f64,
}

impl SentimentScore {
    /// Value substituted when a review cannot be scored.
    pub fn fallback() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: 0.0,
        }
    }
}

/// Trait for sentiment model implementations.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> Result<SentimentScore>;
}

/// Processed review annotated with its sentiment.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SentimentReview {
    pub review: String,
    pub rating: Option<u8>,
    pub date: NaiveDate,
    pub bank: String,
    pub source: String,
    pub sentiment_label: SentimentLabel,
    pub sentiment_score: f64,
}

impl SentimentReview {
    pub fn new(review: CleanReview, sentiment: SentimentScore) -> Self {
        Self {
            review: review.review,
            rating: review.rating,
            date: review.date,
            bank: review.bank,
            source: review.source,
            sentiment_label: sentiment.label,
            sentiment_score: sentiment.score,
        }
    }
}

impl Tabular for SentimentReview {
    const COLUMNS: &'static [&'static str] = &[
        "review",
        "rating",
        "date",
        "bank",
        "source",
        "sentiment_label",
        "sentiment_score",
    ];
}

/// Cut `text` to at most `max_chars` characters without splitting one.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Score a review, falling back to neutral/0.0 on any scorer failure.
pub fn score_or_fallback(
    scorer: &dyn SentimentScorer,
    text: &str,
    max_chars: usize,
) -> SentimentScore {
    match scorer.score(truncate_chars(text, max_chars)) {
        Ok(score) => score,
        Err(err) => {
            warn!(%err, "error scoring review; using neutral fallback");
            SentimentScore::fallback()
        }
    }
}

/// Score every review concurrently, keeping the input order.
pub async fn annotate(
    scorer: Arc<dyn SentimentScorer>,
    reviews: Vec<CleanReview>,
    max_chars: usize,
    concurrency: usize,
) -> Vec<SentimentReview> {
    stream::iter(reviews)
        .map(|review| {
            let scorer = Arc::clone(&scorer);
            async move {
                let text = review.review.clone();
                let sentiment = tokio::task::spawn_blocking(move || {
                    score_or_fallback(scorer.as_ref(), &text, max_chars)
                })
                .await
                .unwrap_or_else(|err| {
                    warn!(%err, "scoring task aborted; using neutral fallback");
                    SentimentScore::fallback()
                });
                SentimentReview::new(review, sentiment)
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// Pick the configured scorer: the ONNX model when a model directory is set,
/// the lexicon scorer otherwise.
pub fn load_scorer(settings: &Settings) -> Result<Arc<dyn SentimentScorer>> {
    if let Some(dir) = &settings.sentiment_model_dir {
        return model_scorer(dir);
    }
    info!("using lexicon sentiment scorer");
    Ok(Arc::new(LexiconScorer))
}

#[cfg(feature = "onx")]
fn model_scorer(dir: &Path) -> Result<Arc<dyn SentimentScorer>> {
    let scorer = super::onnx::OnnxScorer::load(dir)?;
    info!(dir = %dir.display(), "loaded onnx sentiment model");
    Ok(Arc::new(scorer))
}

#[cfg(not(feature = "onx"))]
fn model_scorer(dir: &Path) -> Result<Arc<dyn SentimentScorer>> {
    warn!(dir = %dir.display(), "built without `onx`; using lexicon sentiment scorer");
    Ok(Arc::new(LexiconScorer))
}

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}']+").expect("valid regex"));

static POSITIVE_TERMS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "good", "great", "excellent", "amazing", "awesome", "best", "love", "loved", "like",
        "nice", "easy", "fast", "quick", "smooth", "helpful", "reliable", "convenient",
        "perfect", "wonderful", "fantastic", "useful", "simple", "secure", "efficient",
        "satisfied", "happy", "thanks", "thank", "recommend", "improved", "works", "working",
        "friendly", "responsive", "clean", "stable", "brilliant", "superb", "impressive",
    ]
    .into_iter()
    .collect()
});

static NEGATIVE_TERMS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bad", "poor", "terrible", "awful", "worst", "hate", "slow", "crash", "crashes",
        "crashed", "crashing", "bug", "bugs", "buggy", "error", "errors", "fail", "fails",
        "failed", "failure", "problem", "problems", "issue", "issues", "useless", "annoying",
        "disappointed", "disappointing", "frustrating", "broken", "stuck", "delay", "delayed",
        "horrible", "difficult", "unable", "cannot", "waste", "freeze", "freezes",
        "lag", "laggy", "scam", "unreliable", "complicated",
    ]
    .into_iter()
    .collect()
});

const NEGATORS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "wasn't", "can't", "won't",
];

/// Dictionary polarity scorer with single-token negation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconScorer;

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> Result<SentimentScore> {
        if text.trim().is_empty() {
            return Err(PipelineError::Parse {
                field: "review",
                message: "no text to score".into(),
            });
        }

        let lower = text.to_lowercase();
        let mut positive = 0u32;
        let mut negative = 0u32;
        let mut negated = false;
        for token in WORD.find_iter(&lower).map(|m| m.as_str()) {
            let is_pos = POSITIVE_TERMS.contains(token);
            if is_pos || NEGATIVE_TERMS.contains(token) {
                if is_pos != negated {
                    positive += 1;
                } else {
                    negative += 1;
                }
            }
            negated = NEGATORS.contains(&token);
        }

        let total = positive + negative;
        let label = match positive.cmp(&negative) {
            Ordering::Greater => SentimentLabel::Positive,
            Ordering::Less => SentimentLabel::Negative,
            Ordering::Equal => SentimentLabel::Neutral,
        };
        let score = if total == 0 || label == SentimentLabel::Neutral {
            0.5
        } else {
            let margin = f64::from(positive.abs_diff(negative)) / f64::from(total);
            0.5 + 0.5 * margin
        };
        Ok(SentimentScore { label, score })
    }
}

/// Label counts reported after a sentiment run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentSummary {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentSummary {
    pub fn tally(reviews: &[SentimentReview]) -> Self {
        reviews.iter().fold(Self::default(), |mut acc, review| {
            match review.sentiment_label {
                SentimentLabel::Positive => acc.positive += 1,
                SentimentLabel::Negative => acc.negative += 1,
                SentimentLabel::Neutral => acc.neutral += 1,
            }
            acc
        })
    }
}

/// Log the outcome of a sentiment run.
pub fn log_summary(summary: &SentimentSummary) {
    info!(
        positive = summary.positive,
        negative = summary.negative,
        neutral = summary.neutral,
        "sentiment analysis completed"
    );
}
