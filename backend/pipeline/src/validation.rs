//! Caller-input checks. Pure: they touch nothing but their arguments.

use once_cell::sync::Lazy;
use receiptflow_core::{GeoPoint, OcrEngine, PipelineError};
use regex::Regex;

// word segments joined by single '.' or '-', then one or more '.tld' of length >= 2
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\w+([.\-]?\w+)*@\w+([.\-]?\w+)*(\.\w{2,})+$").unwrap()
});

pub fn validate_email(email: &str) -> Result<(), PipelineError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(PipelineError::Validation("email is not valid".into()))
    }
}

pub fn validate_uid(uid: &str) -> Result<(), PipelineError> {
    if uid.trim().is_empty() {
        return Err(PipelineError::Validation("uid is required".into()));
    }
    Ok(())
}

pub fn validate_coordinates(origin: &GeoPoint) -> Result<(), PipelineError> {
    if !(-180.0..=180.0).contains(&origin.lon) {
        return Err(PipelineError::Validation(format!("longitude {} is out of range", origin.lon)));
    }
    if !(-90.0..=90.0).contains(&origin.lat) {
        return Err(PipelineError::Validation(format!("latitude {} is out of range", origin.lat)));
    }
    Ok(())
}

/// The OCR model handle is mandatory.
pub fn require_model(model: Option<&dyn OcrEngine>) -> Result<&dyn OcrEngine, PipelineError> {
    model.ok_or_else(|| {
        PipelineError::Validation("the model parameter is required but not provided".into())
    })
}
