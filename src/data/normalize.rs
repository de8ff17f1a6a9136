//! Review normalisation: deduplication, missing-value repair and date canonicalisation.

use std::{collections::HashSet, path::Path, str::FromStr};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::Settings,
    data::{
        dates, io,
        record::{CleanReview, ReviewRecord, UNKNOWN_ENTITY},
    },
    error::PipelineError,
};

/// Treatment of absent ratings during repair.
///
/// `Clamp` imputes 0 and then clamps into `[1, 5]`, so an absent rating and a
/// rating of 1 cannot be told apart afterwards. `PreserveMissing` leaves the
/// cell empty instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RatingPolicy {
    #[default]
    Clamp,
    PreserveMissing,
}

impl FromStr for RatingPolicy {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "preserve-missing" | "preserve_missing" => Ok(Self::PreserveMissing),
            other => Err(PipelineError::Config(format!(
                "unknown rating policy `{other}` (expected clamp or preserve-missing)"
            ))),
        }
    }
}

/// Counts produced by the missing-value pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub missing_dropped: usize,
    pub ratings_imputed: usize,
    pub ratings_clamped: usize,
    pub entities_defaulted: usize,
}

/// Per-stage counters for one normalizer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub loaded: usize,
    pub duplicates_removed: usize,
    pub missing_dropped: usize,
    pub ratings_imputed: usize,
    pub ratings_clamped: usize,
    pub entities_defaulted: usize,
    pub dates_dropped: usize,
    pub written: usize,
}

/// Normalise the configured raw dump into the processed reviews file.
#[instrument(skip(settings))]
pub async fn run(settings: &Settings) -> Result<NormalizeStats> {
    normalize_file(
        &settings.raw_reviews_path(),
        &settings.processed_reviews_path(),
        settings.rating_policy,
    )
}

/// Load, clean and save a single dataset. Nothing is written unless every
/// stage succeeds.
pub fn normalize_file(
    input: &Path,
    output: &Path,
    policy: RatingPolicy,
) -> Result<NormalizeStats> {
    info!(input = %input.display(), "starting preprocessing pipeline");
    let rows = io::load(input).context("load stage failed")?;
    let (cleaned, mut stats) = clean(rows, policy)?;
    io::save(&cleaned, output).context("save stage failed")?;
    stats.written = cleaned.len();

    info!(
        loaded = stats.loaded,
        duplicates_removed = stats.duplicates_removed,
        missing_dropped = stats.missing_dropped,
        ratings_imputed = stats.ratings_imputed,
        ratings_clamped = stats.ratings_clamped,
        entities_defaulted = stats.entities_defaulted,
        dates_dropped = stats.dates_dropped,
        written = stats.written,
        "preprocessing summary"
    );
    for sample in cleaned.iter().take(3) {
        debug!(?sample, "processed sample");
    }
    Ok(stats)
}

/// Apply the four cleaning passes and the final projection in fixed order.
pub fn clean(
    rows: Vec<ReviewRecord>,
    policy: RatingPolicy,
) -> Result<(Vec<CleanReview>, NormalizeStats)> {
    let mut stats = NormalizeStats {
        loaded: rows.len(),
        ..NormalizeStats::default()
    };

    let (rows, removed) = deduplicate(rows);
    stats.duplicates_removed = removed;

    let (rows, report) = repair_missing(rows, policy);
    stats.missing_dropped = report.missing_dropped;
    stats.ratings_imputed = report.ratings_imputed;
    stats.ratings_clamped = report.ratings_clamped;
    stats.entities_defaulted = report.entities_defaulted;

    let (rows, dropped) = normalize_dates(rows);
    stats.dates_dropped = dropped;

    let cleaned = select_output_columns(rows).context("select_output_columns stage failed")?;
    Ok((cleaned, stats))
}

/// Keep the first occurrence of each case-folded review text, preserving order.
pub fn deduplicate(rows: Vec<ReviewRecord>) -> (Vec<ReviewRecord>, usize) {
    let initial = rows.len();
    let mut seen: HashSet<Option<String>> = HashSet::with_capacity(initial);
    let kept: Vec<ReviewRecord> = rows
        .into_iter()
        .filter(|row| seen.insert(row.review.as_deref().map(str::to_lowercase)))
        .collect();
    let removed = initial - kept.len();
    info!(removed, "removed duplicate reviews");
    (kept, removed)
}

/// Drop rows without review text, impute and clamp ratings, and default
/// absent bank/source names.
pub fn repair_missing(
    rows: Vec<ReviewRecord>,
    policy: RatingPolicy,
) -> (Vec<ReviewRecord>, RepairReport) {
    let mut report = RepairReport::default();
    let initial = rows.len();

    let repaired: Vec<ReviewRecord> = rows
        .into_iter()
        .filter(|row| {
            row.review
                .as_deref()
                .is_some_and(|text| !text.trim().is_empty())
        })
        .map(|row| {
            let rating = repair_rating(row.rating.as_deref(), policy, &mut report);
            let bank = default_entity(row.bank, &mut report);
            let source = default_entity(row.source, &mut report);
            ReviewRecord {
                rating: rating.map(|value| value.to_string()),
                bank: Some(bank),
                source: Some(source),
                ..row
            }
        })
        .collect();

    report.missing_dropped = initial - repaired.len();
    info!(
        removed = report.missing_dropped,
        imputed = report.ratings_imputed,
        clamped = report.ratings_clamped,
        defaulted = report.entities_defaulted,
        "removed rows with missing data"
    );
    (repaired, report)
}

fn repair_rating(
    raw: Option<&str>,
    policy: RatingPolicy,
    report: &mut RepairReport,
) -> Option<u8> {
    let parsed = raw.and_then(|value| {
        let rating = parse_rating(value);
        if rating.is_none() {
            warn!(value, "unparsable rating treated as missing");
        }
        rating
    });

    let value = match (parsed, policy) {
        (Some(value), _) => value,
        (None, RatingPolicy::Clamp) => {
            report.ratings_imputed += 1;
            0
        }
        (None, RatingPolicy::PreserveMissing) => {
            report.ratings_imputed += 1;
            return None;
        }
    };

    if parsed.is_some() && !(1..=5).contains(&value) {
        report.ratings_clamped += 1;
    }
    Some(clamp_rating(value))
}

/// Clamp any integer rating into `[1, 5]`.
pub fn clamp_rating(value: i64) -> u8 {
    value.clamp(1, 5) as u8
}

/// Parse an integer rating; fractional values truncate toward zero.
pub fn parse_rating(raw: &str) -> Option<i64> {
    let value = raw.trim();
    if let Ok(parsed) = value.parse::<i64>() {
        return Some(parsed);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.trunc() as i64)
}

fn default_entity(value: Option<String>, report: &mut RepairReport) -> String {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(value) => value,
        None => {
            report.entities_defaulted += 1;
            UNKNOWN_ENTITY.to_string()
        }
    }
}

/// Rewrite parsable dates to `YYYY-MM-DD` and drop everything else.
pub fn normalize_dates(rows: Vec<ReviewRecord>) -> (Vec<ReviewRecord>, usize) {
    let initial = rows.len();
    let kept: Vec<ReviewRecord> = rows
        .into_iter()
        .filter_map(|row| {
            let parsed = row.date.as_deref().and_then(dates::parse_date);
            match parsed {
                Some(date) => Some(ReviewRecord {
                    date: Some(dates::canonical(date)),
                    ..row
                }),
                None => {
                    debug!(date = ?row.date, "dropping row with invalid date");
                    None
                }
            }
        })
        .collect();
    let removed = initial - kept.len();
    info!(removed, "normalized dates, removed invalid entries");
    (kept, removed)
}

/// Project cleaned rows onto the canonical five-column schema.
///
/// Fails when a row still lacks a field the earlier passes guarantee, which
/// means the dataset did not go through them.
pub fn select_output_columns(
    rows: Vec<ReviewRecord>,
) -> Result<Vec<CleanReview>, PipelineError> {
    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| {
            let review = required(row.review, "review", idx)?;
            let date_text = required(row.date, "date", idx)?;
            let date = NaiveDate::parse_from_str(&date_text, dates::CANONICAL_FORMAT)
                .map_err(|err| PipelineError::Parse {
                    field: "date",
                    message: format!("row {idx}: `{date_text}` is not canonical ({err})"),
                })?;
            let rating = row
                .rating
                .map(|text| {
                    text.parse::<u8>()
                        .ok()
                        .filter(|value| (1..=5).contains(value))
                        .ok_or_else(|| PipelineError::Parse {
                            field: "rating",
                            message: format!("row {idx}: `{text}` is not a repaired rating"),
                        })
                })
                .transpose()?;
            Ok(CleanReview {
                review,
                rating,
                date,
                bank: required(row.bank, "bank", idx)?,
                source: required(row.source, "source", idx)?,
            })
        })
        .collect()
}

fn required(value: Option<String>, column: &str, idx: usize) -> Result<String, PipelineError> {
    value.ok_or_else(|| PipelineError::Schema(format!("row {idx} has no `{column}` value")))
}
