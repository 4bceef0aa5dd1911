//! Config file location and loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, info};

use crate::env::resolve_env_vars;
use crate::schema::ReceiptflowConfig;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "receiptflow.yaml";

/// Env var naming the config file.
pub const CONFIG_ENV_VAR: &str = "RECEIPTFLOW_CONFIG";

/// Resolve the config file path.
/// Priority: explicit path > `RECEIPTFLOW_CONFIG` env > `./receiptflow.yaml`
pub fn config_file_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

/// Load and parse the config from disk, resolving `${VAR}` references.
///
/// Returns `Ok(Default::default())` if the file doesn't exist.
pub async fn load_config(path: &Path) -> Result<ReceiptflowConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(ReceiptflowConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config = parse_config(&raw)
        .with_context(|| format!("Failed to load config at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Parse YAML text into a config. Empty text yields the default config.
pub fn parse_config(raw: &str) -> Result<ReceiptflowConfig> {
    if raw.trim().is_empty() {
        return Ok(ReceiptflowConfig::default());
    }
    let value: serde_yaml::Value = serde_yaml::from_str(raw).context("Invalid YAML")?;
    let value = resolve_env_vars(value)?;
    serde_yaml::from_value(value).context("Config does not match the expected schema")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = config_file_path(Some(Path::new("/etc/receiptflow.yaml")));
        assert_eq!(path, PathBuf::from("/etc/receiptflow.yaml"));
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("absent.yaml")).await.unwrap();
        assert!(cfg.ocr.is_none());
    }

    #[tokio::test]
    async fn loads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receiptflow.yaml");
        fs::write(&path, "recommender:\n  topN: 3\n").await.unwrap();
        let cfg = load_config(&path).await.unwrap();
        assert_eq!(cfg.recommender.unwrap().top_n, Some(3));
    }

    #[test]
    fn schema_mismatch_is_reported() {
        let err = parse_config("recommender:\n  topN: lots\n").unwrap_err();
        assert!(format!("{err:#}").contains("expected schema"));
    }
}
