//! Optical Character Recognition (OCR)
//!
//! Sends a receipt image to a vision model and returns the transcribed text.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use receiptflow_core::{OcrEngine, OcrOutput};
use tokio::fs;
use tracing::info;

use crate::mime::detect_image_mime;
use crate::vision::{describe_image, VisionProvider};

const OCR_PROMPT: &str = "Transcribe every piece of text on this receipt exactly as printed, \
one printed line per output line. Include store name, address, item lines, prices, totals, \
date and time. Do not summarize or add commentary.";

pub struct VisionOcr {
    provider: VisionProvider,
}

impl VisionOcr {
    pub fn new(provider: VisionProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl OcrEngine for VisionOcr {
    fn name(&self) -> &str {
        self.provider.kind().name()
    }

    async fn recognize(&self, image_path: &Path) -> Result<OcrOutput> {
        let mime = detect_image_mime(image_path)
            .ok_or_else(|| anyhow!("unsupported image type: {}", image_path.display()))?;
        let bytes = fs::read(image_path)
            .await
            .with_context(|| format!("Failed to read receipt image: {}", image_path.display()))?;

        info!(image = %image_path.display(), bytes = bytes.len(), "Running OCR detection");
        let text = describe_image(&self.provider, &bytes, mime, OCR_PROMPT).await?;
        if text.trim().is_empty() {
            bail!("OCR returned no text for {}", image_path.display());
        }

        Ok(OcrOutput {
            text,
            engine: self.name().to_string(),
        })
    }
}
