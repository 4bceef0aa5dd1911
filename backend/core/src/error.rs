use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for one pipeline run.
///
/// Every stage fails fast with exactly one of these variants.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("dataset not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to parse dataset: {0}")]
    Format(String),

    #[error("invalid dataset: {0}")]
    Schema(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("failed to decode extractor output after {attempts} attempts: {last}")]
    ExtractionExhausted {
        attempts: u32,
        last: serde_json::Error,
    },

    #[error("columns of the dataset {expected:?} and the extracted record {found:?} do not match")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("failed to back up dataset to {}: {source}", .path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to save updated dataset at {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to generate recommendations: {0}")]
    Recommendation(#[source] anyhow::Error),
}

impl PipelineError {
    /// Stable tag for logs and machine-readable output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Format(_) => "format",
            Self::Schema(_) => "schema",
            Self::Validation(_) => "validation",
            Self::Extraction(_) => "extraction",
            Self::ExtractionExhausted { .. } => "extraction_exhausted",
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::Backup { .. } => "backup",
            Self::Persist { .. } => "persist",
            Self::Recommendation(_) => "recommendation",
        }
    }
}

/// Failure surfaced by a field extractor.
///
/// Only `Decode` is eligible for retry.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed JSON from extractor: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExtractError {
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}
