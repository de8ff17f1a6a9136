//! Batch pipeline turning scraped bank app reviews into a clean, annotated corpus.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod nlp;

pub use error::{PipelineError, Result};
