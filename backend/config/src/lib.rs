//! `receiptflow-config`: runtime configuration.
//!
//! Provides:
//! - Typed config schema (dataset, extraction retry, OCR, extractor, recommender, logging)
//! - YAML loading with `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with warnings and errors

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_file_path, load_config, parse_config, CONFIG_ENV_VAR, CONFIG_FILE_NAME};
pub use schema::{
    DatasetConfig, ExtractionConfig, ExtractorConfig, LoggingConfig, OcrConfig, ReceiptflowConfig,
    RecommenderConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Result};
use std::path::Path;

/// Load, substitute env vars, apply defaults, and validate a config file.
///
/// Warnings are logged; any validation error fails the load.
pub async fn load_and_prepare(path: &Path) -> Result<ReceiptflowConfig> {
    let config = apply_all_defaults(load_config(path).await?);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if let Some(first) = report.errors.first() {
        for error in &report.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
        bail!("{first} ({} error(s) total)", report.errors.len());
    }

    Ok(config)
}
