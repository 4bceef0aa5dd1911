//! Vision/text generation against hosted LLM endpoints.
//!
//! Both OCR and field extraction go through here.
use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use receiptflow_logging::redact_sensitive_data;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Supported provider APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions, or any compatible server.
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "gemini" => Some(Self::Gemini),
            _ => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::Gemini => "gemini-2.0-flash",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

/// A configured provider endpoint.
#[derive(Clone)]
pub struct VisionProvider {
    kind: ProviderKind,
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl std::fmt::Debug for VisionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionProvider")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl VisionProvider {
    pub fn new(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            kind,
            api_key: api_key.into(),
            model: kind.default_model().to_string(),
            base_url: kind.default_base_url().to_string(),
            client: Client::new(),
        }
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new(ProviderKind::OpenAi, api_key)
    }

    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self::new(ProviderKind::Gemini, api_key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Run a prompt over an image and return the model's text reply.
pub async fn describe_image(
    provider: &VisionProvider,
    image_bytes: &[u8],
    mime_type: &str,
    prompt: &str,
) -> Result<String> {
    let b64 = STANDARD.encode(image_bytes);
    match provider.kind {
        ProviderKind::OpenAi => {
            let content = serde_json::json!([
                { "type": "text", "text": prompt },
                { "type": "image_url",
                  "image_url": { "url": format!("data:{};base64,{}", mime_type, b64) } }
            ]);
            openai_chat(provider, content).await
        }
        ProviderKind::Gemini => {
            let parts = serde_json::json!([
                { "text": prompt },
                { "inlineData": { "mimeType": mime_type, "data": b64 } }
            ]);
            gemini_generate(provider, parts).await
        }
    }
}

/// Run a text-only prompt.
pub async fn complete_text(provider: &VisionProvider, prompt: &str) -> Result<String> {
    match provider.kind {
        ProviderKind::OpenAi => openai_chat(provider, serde_json::json!(prompt)).await,
        ProviderKind::Gemini => gemini_generate(provider, serde_json::json!([{ "text": prompt }])).await,
    }
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

async fn openai_chat(provider: &VisionProvider, content: serde_json::Value) -> Result<String> {
    info!(model = %provider.model, "[Vision] Calling OpenAI-compatible endpoint");
    let body = serde_json::json!({
        "model": provider.model,
        "messages": [{ "role": "user", "content": content }],
        "temperature": 0,
        "max_tokens": 2048
    });
    let resp = provider
        .client
        .post(format!("{}/chat/completions", provider.base_url))
        .bearer_auth(&provider.api_key)
        .json(&body)
        .send()
        .await
        .context("OpenAI HTTP request failed")?;

    let status = resp.status();
    if !status.is_success() {
        let error_body = resp.text().await.unwrap_or_default();
        bail!("OpenAI returned {}: {}", status, redact_sensitive_data(&error_body));
    }
    let parsed: OpenAiResponse = resp.json().await.context("Failed to parse OpenAI response")?;
    Ok(parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default())
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

async fn gemini_generate(provider: &VisionProvider, parts: serde_json::Value) -> Result<String> {
    info!(model = %provider.model, "[Vision] Calling Gemini");
    let url = format!("{}/models/{}:generateContent", provider.base_url, provider.model);
    let body = serde_json::json!({
        "contents": [{ "parts": parts }],
        "generationConfig": { "temperature": 0 }
    });
    let resp = provider
        .client
        .post(&url)
        .header("x-goog-api-key", &provider.api_key)
        .json(&body)
        .send()
        .await
        .context("Gemini HTTP request failed")?;

    let status = resp.status();
    if !status.is_success() {
        let error_body = resp.text().await.unwrap_or_default();
        bail!("Gemini returned {}: {}", status, redact_sensitive_data(&error_body));
    }
    let parsed: GeminiResponse = resp.json().await.context("Failed to parse Gemini response")?;
    Ok(parsed
        .candidates
        .into_iter()
        .next()
        .map(|c| {
            c.content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default())
}
