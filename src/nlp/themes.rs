//! Rule-based grouping of extracted keywords into review themes.

use std::{fs, path::Path};

use chrono::NaiveDate;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_with::{formats::CommaSeparator, serde_as, StringWithSeparator};
use tracing::debug;

use crate::{
    data::record::{CleanReview, Tabular},
    error::{PipelineError, Result},
    nlp::keywords::{preprocess, KeywordExtractor},
};

/// Label assigned when no keyword matches the table.
pub const FALLBACK_THEME: &str = "Miscellaneous";

/// Maps every keyword containing `keyword` to `theme`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThemeRule {
    pub keyword: String,
    pub theme: String,
}

impl ThemeRule {
    pub fn new(keyword: &str, theme: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            theme: theme.to_string(),
        }
    }
}

/// Ordered keyword → theme rules. Output themes follow rule order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeTable {
    rules: Vec<ThemeRule>,
}

impl Default for ThemeTable {
    fn default() -> Self {
        Self::new(vec![
            ThemeRule::new("login", "Account Access"),
            ThemeRule::new("password", "Account Access"),
            ThemeRule::new("transfer", "Transaction Performance"),
            ThemeRule::new("delay", "Transaction Performance"),
            ThemeRule::new("crash", "App Reliability"),
            ThemeRule::new("support", "Customer Support"),
            ThemeRule::new("help", "Customer Support"),
            ThemeRule::new("interface", "User Experience"),
            ThemeRule::new("design", "User Experience"),
            ThemeRule::new("feature", "Feature Request"),
        ])
    }
}

impl ThemeTable {
    pub fn new(rules: Vec<ThemeRule>) -> Self {
        Self { rules }
    }

    /// Read a JSON array of `{"keyword": .., "theme": ..}` objects.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| PipelineError::io(path, err))?;
        let rules: Vec<ThemeRule> = serde_json::from_str(&raw).map_err(|err| {
            PipelineError::Config(format!("theme table {}: {err}", path.display()))
        })?;
        if rules.is_empty() {
            return Err(PipelineError::Config(format!(
                "theme table {} has no rules",
                path.display()
            )));
        }
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[ThemeRule] {
        &self.rules
    }

    /// Themes for one review's keywords, de-duplicated in table order.
    pub fn assign<S: AsRef<str>>(&self, keywords: &[S]) -> Vec<String> {
        let themes: IndexSet<&str> = self
            .rules
            .iter()
            .filter(|rule| {
                keywords
                    .iter()
                    .any(|keyword| keyword.as_ref().contains(rule.keyword.as_str()))
            })
            .map(|rule| rule.theme.as_str())
            .collect();
        if themes.is_empty() {
            return vec![FALLBACK_THEME.to_string()];
        }
        themes.into_iter().map(str::to_string).collect()
    }
}

/// Processed review annotated with keywords and themes.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThemedReview {
    pub review: String,
    pub rating: Option<u8>,
    pub date: NaiveDate,
    pub bank: String,
    pub source: String,
    #[serde_as(as = "StringWithSeparator::<CommaSeparator, String>")]
    pub keywords: Vec<String>,
    #[serde_as(as = "StringWithSeparator::<CommaSeparator, String>")]
    pub themes: Vec<String>,
}

impl Tabular for ThemedReview {
    const COLUMNS: &'static [&'static str] = &[
        "review", "rating", "date", "bank", "source", "keywords", "themes",
    ];
}

/// Extract corpus keywords and map them to themes, one output row per input row.
pub fn annotate_themes(
    reviews: Vec<CleanReview>,
    extractor: &KeywordExtractor,
    table: &ThemeTable,
) -> Vec<ThemedReview> {
    let documents: Vec<String> = reviews.iter().map(|r| preprocess(&r.review)).collect();
    let keywords = extractor.extract(&documents);
    debug!(reviews = reviews.len(), "extracted review keywords");

    reviews
        .into_iter()
        .zip(keywords)
        .map(|(review, scored)| {
            let keywords: Vec<String> = scored.into_iter().map(|k| k.term).collect();
            let themes = table.assign(&keywords);
            ThemedReview {
                review: review.review,
                rating: review.rating,
                date: review.date,
                bank: review.bank,
                source: review.source,
                keywords,
                themes,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_matches_map_to_themes_in_table_order() {
        let table = ThemeTable::default();
        assert_eq!(
            table.assign(&["crashes", "login", "passwords"]),
            vec!["Account Access", "App Reliability"]
        );
    }

    #[test]
    fn unmatched_keywords_fall_back() {
        let table = ThemeTable::default();
        assert_eq!(table.assign(&["fees"]), vec![FALLBACK_THEME]);
        assert_eq!(table.assign::<&str>(&[]), vec![FALLBACK_THEME]);
    }
}
