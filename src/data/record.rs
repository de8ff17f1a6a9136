//! Review row shapes shared by the normalizer and the downstream jobs.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Columns every raw and processed dataset must carry, in output order.
pub const OUTPUT_COLUMNS: [&str; 5] = ["review", "rating", "date", "bank", "source"];

/// Sentinel written when a bank or source name is absent.
pub const UNKNOWN_ENTITY: &str = "Unknown";

/// Row types with a fixed, ordered column set.
pub trait Tabular {
    /// Header names, in the order the serialized fields appear.
    const COLUMNS: &'static [&'static str];
}

/// One ingested row. Empty cells deserialize as `None`; extra columns are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReviewRecord {
    #[serde(default, deserialize_with = "non_empty")]
    pub review: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub rating: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub bank: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub source: Option<String>,
}

impl ReviewRecord {
    /// Build a fully populated record, mostly useful in tests and fixtures.
    pub fn new(review: &str, rating: &str, date: &str, bank: &str, source: &str) -> Self {
        let cell = |value: &str| (!value.is_empty()).then(|| value.to_string());
        Self {
            review: cell(review),
            rating: cell(rating),
            date: cell(date),
            bank: cell(bank),
            source: cell(source),
        }
    }
}

impl Tabular for ReviewRecord {
    const COLUMNS: &'static [&'static str] = &OUTPUT_COLUMNS;
}

/// Canonical, schema-conformant review. Field order is the output column order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CleanReview {
    pub review: String,
    pub rating: Option<u8>,
    pub date: NaiveDate,
    pub bank: String,
    pub source: String,
}

impl Tabular for CleanReview {
    const COLUMNS: &'static [&'static str] = &OUTPUT_COLUMNS;
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()))
}
