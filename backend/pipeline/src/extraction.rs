//! OCR + field extraction, retried on malformed extractor JSON only.

use std::fmt;
use std::path::Path;

use receiptflow_core::{ExtractError, FieldExtractor, OcrEngine, PipelineError};
use receiptflow_dataset::Table;
use receiptflow_logging::redact_sensitive_data;
use tracing::{debug, info};

use crate::retry::{retry_if, RetryError, RetryPolicy};

/// Inputs for one extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    pub image_path: &'a Path,
    pub key_path: &'a Path,
    pub uid: &'a str,
    pub email: &'a str,
}

/// Failure of a single OCR + extraction attempt.
#[derive(Debug)]
pub enum AttemptError {
    Decode(serde_json::Error),
    Fatal(PipelineError),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "malformed JSON: {e}"),
            Self::Fatal(e) => e.fmt(f),
        }
    }
}

impl From<AttemptError> for PipelineError {
    fn from(error: AttemptError) -> Self {
        match error {
            AttemptError::Decode(e) => PipelineError::Extraction(format!("malformed JSON: {e}")),
            AttemptError::Fatal(e) => e,
        }
    }
}

/// Only malformed-JSON failures are worth another attempt.
pub fn is_retryable(error: &AttemptError) -> bool {
    matches!(error, AttemptError::Decode(_))
}

/// Produce the extracted record for one receipt.
///
/// Each attempt re-runs OCR and extraction from scratch.
pub async fn extract_record(
    ocr: &dyn OcrEngine,
    extractor: &dyn FieldExtractor,
    request: ExtractionRequest<'_>,
    policy: &RetryPolicy,
) -> Result<Table, PipelineError> {
    let outcome = retry_if(policy, is_retryable, |attempt| attempt_once(ocr, extractor, request, attempt)).await;

    match outcome {
        Ok(table) => {
            info!(uid = request.uid, rows = table.len(), "Extracted receipt record");
            Ok(table)
        }
        Err(RetryError::Exhausted { attempts, last: AttemptError::Decode(last) }) => {
            Err(PipelineError::ExtractionExhausted { attempts, last })
        }
        Err(RetryError::Exhausted { last, .. }) | Err(RetryError::Fatal(last)) => Err(last.into()),
    }
}

async fn attempt_once(
    ocr: &dyn OcrEngine,
    extractor: &dyn FieldExtractor,
    request: ExtractionRequest<'_>,
    attempt: u32,
) -> Result<Table, AttemptError> {
    debug!(attempt, engine = ocr.name(), image = %request.image_path.display(), "Running OCR");
    let raw = ocr.recognize(request.image_path).await.map_err(|e| {
        AttemptError::Fatal(PipelineError::Extraction(format!(
            "OCR failed: {}",
            redact_sensitive_data(&format!("{e:#}"))
        )))
    })?;

    let mapping = extractor
        .extract(&raw, request.key_path, request.uid, request.email)
        .await
        .map_err(|e| match e {
            ExtractError::Decode(json) => AttemptError::Decode(json),
            ExtractError::Other(other) => AttemptError::Fatal(PipelineError::Extraction(
                redact_sensitive_data(&format!("{other:#}")),
            )),
        })?;

    Table::from_json(&mapping).map_err(AttemptError::Fatal)
}
