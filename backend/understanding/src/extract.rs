//! Field extraction: turn OCR text into purchase rows with an LLM.
//!
//! The model is asked for JSON; a reply that doesn't parse is reported as
//! `ExtractError::Decode` so the caller can retry it.

use std::path::Path;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use receiptflow_core::{ExtractError, FieldExtractor, OcrOutput};
use serde_json::{Map, Value};
use tokio::fs;
use tracing::debug;

use crate::vision::{complete_text, ProviderKind, VisionProvider};

/// Columns filled by the pipeline rather than by the model.
const INJECTED: [&str; 2] = ["uid", "email"];

pub struct LlmFieldExtractor {
    kind: ProviderKind,
    model: Option<String>,
    base_url: Option<String>,
    /// Output columns, in dataset order.
    fields: Vec<String>,
}

impl LlmFieldExtractor {
    pub fn new(kind: ProviderKind, fields: Vec<String>) -> Self {
        Self {
            kind,
            model: None,
            base_url: None,
            fields,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    fn provider(&self, api_key: String) -> VisionProvider {
        let mut provider = VisionProvider::new(self.kind, api_key);
        if let Some(model) = &self.model {
            provider = provider.with_model(model.clone());
        }
        if let Some(url) = &self.base_url {
            provider = provider.with_base_url(url.clone());
        }
        provider
    }

    fn prompt(&self, ocr_text: &str) -> String {
        let wanted: Vec<&str> = self
            .fields
            .iter()
            .map(String::as_str)
            .filter(|f| !INJECTED.contains(f))
            .collect();
        format!(
            "Extract the purchases from this receipt text. Reply with only a JSON array, \
one object per purchased item, each with exactly these keys: {}. Use numbers for \
prices, quantities and coordinates (long, lat of the store), and null when a value \
is unknown. Repeat store-level values on every item.\n\nReceipt text:\n{}",
            wanted.join(", "),
            ocr_text
        )
    }

    /// Order each record by the configured fields and inject `uid`/`email`.
    fn shape(&self, parsed: Value, uid: &str, email: &str) -> Result<Value, ExtractError> {
        let records = match parsed {
            Value::Array(items) => items,
            Value::Object(map) => vec![Value::Object(map)],
            Value::Null => return Ok(Value::Null),
            other => return Err(anyhow!("extractor replied with a bare JSON value: {other}").into()),
        };

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let Value::Object(mut record) = record else {
                return Err(anyhow!("extractor replied with a non-object item").into());
            };
            record.insert("uid".to_string(), Value::String(uid.to_string()));
            record.insert("email".to_string(), Value::String(email.to_string()));

            if self.fields.is_empty() {
                rows.push(Value::Object(record));
                continue;
            }
            let mut ordered = Map::with_capacity(self.fields.len());
            for field in &self.fields {
                ordered.insert(field.clone(), record.remove(field).unwrap_or(Value::Null));
            }
            rows.push(Value::Object(ordered));
        }
        Ok(Value::Array(rows))
    }
}

#[async_trait]
impl FieldExtractor for LlmFieldExtractor {
    async fn extract(
        &self,
        ocr: &OcrOutput,
        key_path: &Path,
        uid: &str,
        email: &str,
    ) -> Result<Value, ExtractError> {
        let api_key = read_api_key(key_path).await?;
        let provider = self.provider(api_key);

        let reply = complete_text(&provider, &self.prompt(&ocr.text)).await?;
        debug!(chars = reply.len(), "Extractor replied");

        let parsed: Value = serde_json::from_str(strip_code_fences(&reply))?;
        self.shape(parsed, uid, email)
    }
}

/// Read an API key from a JSON credentials file (`api_key`, `apiKey` or
/// `key`) or a plain-text file holding just the key.
pub async fn read_api_key(key_path: &Path) -> anyhow::Result<String> {
    let raw = fs::read_to_string(key_path)
        .await
        .with_context(|| format!("Failed to read key file: {}", key_path.display()))?;
    let raw = raw.trim();

    let key = if raw.starts_with('{') {
        let creds: Value = serde_json::from_str(raw)
            .with_context(|| format!("Failed to parse key file: {}", key_path.display()))?;
        ["api_key", "apiKey", "key"]
            .iter()
            .find_map(|k| creds.get(*k).and_then(Value::as_str))
            .map(str::to_string)
            .ok_or_else(|| anyhow!("no api_key in key file {}", key_path.display()))?
    } else {
        raw.to_string()
    };

    if key.is_empty() {
        anyhow::bail!("key file {} is empty", key_path.display());
    }
    Ok(key)
}

/// Strip a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening fence line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extractor() -> LlmFieldExtractor {
        let fields = ["uid", "email", "product", "price", "long", "lat"];
        LlmFieldExtractor::new(ProviderKind::Gemini, fields.iter().map(|f| f.to_string()).collect())
    }

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fences("```json\n[{\"a\": 1}]\n```"), "[{\"a\": 1}]");
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{}\n```\n"), "{}");
    }

    #[test]
    fn shapes_rows_in_field_order() {
        let parsed = json!([{"lat": -6.2, "price": 3.5, "product": "milk", "long": 106.8, "extra": 1}]);
        let shaped = extractor().shape(parsed, "u1", "u1@example.com").unwrap();
        let row = shaped[0].as_object().unwrap();
        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, ["uid", "email", "product", "price", "long", "lat"]);
        assert_eq!(row["uid"], "u1");
        assert_eq!(row["email"], "u1@example.com");
    }

    #[test]
    fn single_object_becomes_one_row() {
        let shaped = extractor().shape(json!({"product": "eggs"}), "u1", "e@x.io").unwrap();
        assert_eq!(shaped.as_array().unwrap().len(), 1);
        assert_eq!(shaped[0]["price"], Value::Null);
    }

    #[test]
    fn bare_values_are_not_decode_errors() {
        let err = extractor().shape(json!("nothing here"), "u1", "e@x.io").unwrap_err();
        assert!(!err.is_decode());
    }

    #[test]
    fn prompt_omits_injected_fields() {
        let prompt = extractor().prompt("TOTAL 5.00");
        assert!(prompt.contains("product, price, long, lat"));
        assert!(!prompt.contains("uid"));
    }

    #[tokio::test]
    async fn reads_key_from_json_or_text() {
        let dir = tempfile::tempdir().unwrap();
        let json_key = dir.path().join("key.json");
        fs::write(&json_key, r#"{"type": "service_account", "api_key": "abc123"}"#).await.unwrap();
        assert_eq!(read_api_key(&json_key).await.unwrap(), "abc123");

        let text_key = dir.path().join("key.txt");
        fs::write(&text_key, "  xyz789\n").await.unwrap();
        assert_eq!(read_api_key(&text_key).await.unwrap(), "xyz789");
    }

    #[tokio::test]
    async fn broken_key_file_is_not_retryable() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("key.json");
        fs::write(&key, "{not json").await.unwrap();
        let ocr = OcrOutput::default();

        let err = extractor().extract(&ocr, &key, "u1", "e@x.io").await.unwrap_err();
        assert!(!err.is_decode());
    }
}
