//! Error taxonomy shared by every pipeline stage.

use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the review pipeline.
///
/// Per-row problems (a bad date, an unscorable review) are normally absorbed
/// by the stage that meets them and turned into a drop or a fallback value.
/// The variants below are what escapes a stage and aborts the batch.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source or destination could not be read or written.
    #[error("i/o failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Delimited text could not be decoded.
    #[error("malformed dataset {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A required column or field is absent.
    #[error("schema error: {0}")]
    Schema(String),

    /// A field could not be converted to its expected type.
    #[error("parse error in {field}: {message}")]
    Parse { field: &'static str, message: String },

    /// A collaborator (sentiment model, warehouse, ...) failed.
    #[error("{service} unavailable: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn upstream(service: &'static str, message: impl ToString) -> Self {
        Self::Upstream {
            service,
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
