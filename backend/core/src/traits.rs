use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::ExtractError;
use crate::types::{GeoPoint, OcrOutput, RecommendationResult};

/// OCR model handle: turns a receipt image into raw text.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Engine name (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    async fn recognize(&self, image_path: &Path) -> Result<OcrOutput>;
}

/// Maps OCR output to a structured purchase record.
///
/// The returned value must be convertible to table rows: an object of
/// scalars, an object of equal-length arrays, or an array of objects.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract(
        &self,
        ocr: &OcrOutput,
        key_path: &Path,
        uid: &str,
        email: &str,
    ) -> Result<serde_json::Value, ExtractError>;
}

/// Produces a ranked list of candidate products for a user.
#[async_trait]
pub trait ProductRecommender: Send + Sync {
    async fn recommend(&self, dataset_path: &Path, uid: &str) -> Result<Vec<String>>;
}

/// Narrows candidate products down to nearby offers.
#[async_trait]
pub trait ProximityRecommender: Send + Sync {
    async fn recommend_nearby(
        &self,
        dataset_path: &Path,
        uid: &str,
        products: &[String],
        origin: GeoPoint,
    ) -> Result<RecommendationResult>;
}
