//! Config validation: collects every problem in one pass.

use crate::schema::ReceiptflowConfig;
use thiserror::Error;

const PROVIDERS: [&str; 2] = ["openai", "gemini"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &ReceiptflowConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_extraction(config, &mut report);
    validate_ocr(config, &mut report);
    validate_extractor(config, &mut report);
    validate_recommender(config, &mut report);
    report
}

fn check_provider(provider: Option<&str>, path: &str, report: &mut ValidationReport) {
    if let Some(name) = provider {
        if !PROVIDERS.contains(&name.to_ascii_lowercase().as_str()) {
            report.error(
                path,
                format!("Unknown provider '{name}'. Use 'openai' or 'gemini'"),
            );
        }
    }
}

fn validate_extraction(config: &ReceiptflowConfig, report: &mut ValidationReport) {
    let Some(extraction) = &config.extraction else { return };
    if extraction.max_attempts == Some(0) {
        report.error("extraction.maxAttempts", "maxAttempts must be >= 1");
    }
    if let Some(factor) = extraction.backoff_factor {
        if !factor.is_finite() || factor < 1.0 {
            report.error("extraction.backoffFactor", "backoffFactor must be >= 1.0");
        }
    }
}

fn validate_ocr(config: &ReceiptflowConfig, report: &mut ValidationReport) {
    let Some(ocr) = &config.ocr else {
        report.warn("ocr", "No OCR model configured; runs will be rejected");
        return;
    };
    check_provider(ocr.provider.as_deref(), "ocr.provider", report);
    if ocr.provider.is_none() {
        report.error("ocr.provider", "OCR provider is required");
    }
    if ocr.api_key.as_deref().map(str::is_empty).unwrap_or(true) {
        report.error("ocr.apiKey", "OCR API key is required");
    }
}

fn validate_extractor(config: &ReceiptflowConfig, report: &mut ValidationReport) {
    let Some(extractor) = &config.extractor else { return };
    check_provider(extractor.provider.as_deref(), "extractor.provider", report);
    if extractor.fields.is_empty() {
        report.warn(
            "extractor.fields",
            "No fields configured; extracted columns follow the model's reply",
        );
    }
    for (i, field) in extractor.fields.iter().enumerate() {
        if field.trim().is_empty() {
            report.error(format!("extractor.fields[{i}]"), "Field name cannot be empty");
        }
    }
}

fn validate_recommender(config: &ReceiptflowConfig, report: &mut ValidationReport) {
    let Some(rec) = &config.recommender else { return };
    if rec.top_n == Some(0) {
        report.error("recommender.topN", "topN must be >= 1");
    }
    if let Some(km) = rec.max_distance_km {
        if !km.is_finite() || km <= 0.0 {
            report.error("recommender.maxDistanceKm", "maxDistanceKm must be a positive number");
        }
    }
}
