use std::{
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use bank_reviews::{
    data::{aggregate, record::CleanReview},
    error::{PipelineError, Result},
    nlp::sentiment::{
        annotate, score_or_fallback, truncate_chars, LexiconScorer, SentimentLabel,
        SentimentReview, SentimentScore, SentimentScorer, SentimentSummary,
    },
};
use chrono::NaiveDate;

fn review(text: &str, bank: &str, rating: u8) -> CleanReview {
    CleanReview {
        review: text.to_string(),
        rating: Some(rating),
        date: NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
        bank: bank.to_string(),
        source: "play-store".to_string(),
    }
}

struct FailingScorer;

impl SentimentScorer for FailingScorer {
    fn score(&self, _text: &str) -> Result<SentimentScore> {
        Err(PipelineError::upstream("sentiment model", "model offline"))
    }
}

#[derive(Default)]
struct RecordingScorer {
    seen: Mutex<Vec<usize>>,
}

impl SentimentScorer for RecordingScorer {
    fn score(&self, text: &str) -> Result<SentimentScore> {
        self.seen.lock().unwrap().push(text.chars().count());
        Ok(SentimentScore {
            label: SentimentLabel::Positive,
            score: 0.9,
        })
    }
}

/// Sleeps longer for shorter texts so completion order differs from input order.
struct SlowScorer;

impl SentimentScorer for SlowScorer {
    fn score(&self, text: &str) -> Result<SentimentScore> {
        thread::sleep(Duration::from_millis(40u64.saturating_sub(text.len() as u64 * 5)));
        Ok(SentimentScore {
            label: SentimentLabel::Neutral,
            score: text.len() as f64 / 100.0,
        })
    }
}

#[test]
fn scorer_failure_falls_back_to_neutral() {
    let score = score_or_fallback(&FailingScorer, "anything", 512);
    assert_eq!(score, SentimentScore::fallback());
    assert_eq!(score.label, SentimentLabel::Neutral);
    assert_eq!(score.score, 0.0);
}

#[test]
fn long_reviews_are_truncated_before_scoring() {
    let scorer = RecordingScorer::default();
    let long = "ብ".repeat(600);
    score_or_fallback(&scorer, &long, 512);
    score_or_fallback(&scorer, "short", 512);
    assert_eq!(*scorer.seen.lock().unwrap(), vec![512, 5]);
    assert_eq!(truncate_chars("héllo", 2), "hé");
}

#[test]
fn lexicon_scores_polarity_and_negation() {
    let positive = LexiconScorer.score("Great app, fast and easy").unwrap();
    assert_eq!(positive.label, SentimentLabel::Positive);
    assert!(positive.score > 0.5 && positive.score <= 1.0);

    let negated = LexiconScorer.score("The app is not good").unwrap();
    assert_eq!(negated.label, SentimentLabel::Negative);

    let neutral = LexiconScorer.score("I opened it yesterday").unwrap();
    assert_eq!(neutral.label, SentimentLabel::Neutral);
    assert_eq!(neutral.score, 0.5);

    assert!(LexiconScorer.score("   ").is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn annotation_keeps_input_order() {
    let reviews: Vec<CleanReview> = ["a", "bb", "ccc", "dddd", "eeeee", "ffffff"]
        .iter()
        .map(|text| review(text, "CBE", 4))
        .collect();
    let annotated = annotate(Arc::new(SlowScorer), reviews.clone(), 512, 4).await;

    let texts: Vec<&str> = annotated.iter().map(|r| r.review.as_str()).collect();
    assert_eq!(texts, vec!["a", "bb", "ccc", "dddd", "eeeee", "ffffff"]);
    assert_eq!(annotated[2].sentiment_score, 0.03);
}

#[tokio::test]
async fn failing_reviews_do_not_abort_the_batch() {
    let reviews = vec![review("one", "CBE", 5), review("two", "BOA", 1)];
    let annotated = annotate(Arc::new(FailingScorer), reviews, 512, 2).await;
    assert_eq!(annotated.len(), 2);
    assert!(annotated
        .iter()
        .all(|r| r.sentiment_label == SentimentLabel::Neutral && r.sentiment_score == 0.0));
    assert_eq!(
        SentimentSummary::tally(&annotated),
        SentimentSummary {
            positive: 0,
            negative: 0,
            neutral: 2,
        }
    );
}

#[test]
fn aggregate_groups_by_bank_and_rating() {
    let scored = |text: &str, bank: &str, rating: u8, score: f64| {
        SentimentReview::new(
            review(text, bank, rating),
            SentimentScore {
                label: SentimentLabel::Positive,
                score,
            },
        )
    };
    let reviews = vec![
        scored("a", "CBE", 5, 0.8),
        scored("b", "CBE", 5, 0.6),
        scored("c", "BOA", 1, 0.9),
    ];
    let df = aggregate::sentiment_by_bank_rating(&reviews).unwrap();
    assert_eq!(df.height(), 2);

    let means = df.column("mean_sentiment_score").unwrap().f64().unwrap();
    assert!((means.get(0).unwrap() - 0.7).abs() < 1e-9);
    assert!((means.get(1).unwrap() - 0.9).abs() < 1e-9);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outputs/aggregate.csv");
    aggregate::write_sentiment_aggregate(&reviews, &path).unwrap();
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.starts_with("bank,rating,mean_sentiment_score,reviews"));
}
