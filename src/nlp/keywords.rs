//! Review text preprocessing and corpus TF-IDF keyword extraction.

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use tracing::debug;

static ALPHA_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{Alphabetic}+").expect("valid regex"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
        "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
        "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing", "don",
        "down", "during", "each", "even", "every", "few", "for", "from", "further", "get",
        "got", "had", "has", "have", "having", "he", "her", "here", "hers", "herself", "him",
        "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
        "ll", "made", "make", "many", "me", "might", "more", "most", "much", "must", "my",
        "myself", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other",
        "our", "ours", "ourselves", "out", "over", "own", "please", "really", "re", "same",
        "see", "she", "should", "so", "some", "still", "such", "than", "that", "the", "their",
        "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those",
        "through", "to", "too", "under", "until", "up", "us", "use", "used", "using", "ve",
        "very", "was", "we", "well", "were", "what", "when", "where", "which", "while", "who",
        "whom", "why", "will", "with", "would", "yet", "you", "your", "yours", "yourself",
        "yourselves",
    ]
    .into_iter()
    .collect()
});

/// Lowercase, keep alphabetic tokens of two or more letters and drop stop words.
pub fn preprocess(text: &str) -> String {
    let lower = text.to_lowercase();
    ALPHA_TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|token| token.chars().count() > 1 && !STOP_WORDS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keyword with its L2-normalised TF-IDF weight inside one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredKeyword {
    pub term: String,
    pub weight: f64,
}

/// TF-IDF extractor fitted on the corpus it scores.
#[derive(Debug, Clone, Copy)]
pub struct KeywordExtractor {
    pub top_n: usize,
    pub max_features: usize,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self {
            top_n: 5,
            max_features: 1000,
        }
    }
}

impl KeywordExtractor {
    pub fn new(top_n: usize, max_features: usize) -> Self {
        Self {
            top_n,
            max_features,
        }
    }

    /// Top keywords for every preprocessed document, in input order.
    ///
    /// Inflections sharing a stem (`crash`, `crashes`) count as one term and
    /// are reported under their most frequent surface form. Terms with zero
    /// weight are never returned, so short documents can get fewer than
    /// `top_n` keywords.
    pub fn extract(&self, documents: &[String]) -> Vec<Vec<ScoredKeyword>> {
        let stemmer = Stemmer::create(Algorithm::English);
        let mut surfaces: HashMap<String, HashMap<&str, usize>> = HashMap::new();
        let tokenised: Vec<Vec<String>> = documents
            .iter()
            .map(|doc| {
                doc.split_whitespace()
                    .map(|token| {
                        let stem = stemmer.stem(token).into_owned();
                        *surfaces
                            .entry(stem.clone())
                            .or_default()
                            .entry(token)
                            .or_insert(0) += 1;
                        stem
                    })
                    .collect()
            })
            .collect();
        let display: HashMap<&str, &str> = surfaces
            .iter()
            .filter_map(|(stem, forms)| {
                forms
                    .iter()
                    .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                    .map(|(form, _)| (stem.as_str(), *form))
            })
            .collect();

        let vocabulary = self.vocabulary(&tokenised);
        let idf = inverse_document_frequency(&tokenised, &vocabulary);
        debug!(
            documents = documents.len(),
            vocabulary = vocabulary.len(),
            "fitted tf-idf vocabulary"
        );

        tokenised
            .iter()
            .map(|stems| self.top_terms(stems, &idf, &display))
            .collect()
    }

    /// The `max_features` most frequent stems across the corpus.
    fn vocabulary<'a>(&self, tokenised: &'a [Vec<String>]) -> HashSet<&'a str> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for stem in tokenised.iter().flatten() {
            *counts.entry(stem.as_str()).or_insert(0) += 1;
        }
        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(self.max_features)
            .map(|(stem, _)| stem)
            .collect()
    }

    fn top_terms(
        &self,
        stems: &[String],
        idf: &HashMap<&str, f64>,
        display: &HashMap<&str, &str>,
    ) -> Vec<ScoredKeyword> {
        let mut tf: HashMap<&str, f64> = HashMap::new();
        for stem in stems {
            if idf.contains_key(stem.as_str()) {
                *tf.entry(stem.as_str()).or_insert(0.0) += 1.0;
            }
        }
        let mut weights: Vec<(&str, f64)> = tf
            .into_iter()
            .map(|(stem, count)| {
                let term = display.get(stem).copied().unwrap_or(stem);
                (term, count * idf[stem])
            })
            .collect();
        let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            return Vec::new();
        }

        weights.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        weights
            .into_iter()
            .take(self.top_n)
            .map(|(term, weight)| ScoredKeyword {
                term: term.to_string(),
                weight: weight / norm,
            })
            .collect()
    }
}

/// Smoothed idf: `ln((1 + n) / (1 + df)) + 1`.
fn inverse_document_frequency<'a>(
    tokenised: &'a [Vec<String>],
    vocabulary: &HashSet<&'a str>,
) -> HashMap<&'a str, f64> {
    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for stems in tokenised {
        let unique: HashSet<&str> = stems
            .iter()
            .map(String::as_str)
            .filter(|stem| vocabulary.contains(stem))
            .collect();
        for term in unique {
            *document_frequency.entry(term).or_insert(0) += 1;
        }
    }
    let n = tokenised.len() as f64;
    document_frequency
        .into_iter()
        .map(|(term, df)| (term, ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0))
        .collect()
}
