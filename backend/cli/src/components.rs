//! Builds collaborators and the pipeline from config.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use receiptflow_config::defaults::{
    DEFAULT_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DISTANCE_KM, DEFAULT_PRICE_COLUMN,
    DEFAULT_PRODUCT_COLUMN, DEFAULT_TOP_N,
};
use receiptflow_config::ReceiptflowConfig;
use receiptflow_core::OcrEngine;
use receiptflow_dataset::LoadOptions;
use receiptflow_pipeline::{Backoff, Pipeline, RetryPolicy};
use receiptflow_recommender::{CheapNearbyRecommender, CoPurchaseRecommender, OfferColumns};
use receiptflow_understanding::{LlmFieldExtractor, ProviderKind, VisionOcr, VisionProvider};

/// Upper bound for exponential backoff.
const MAX_BACKOFF_MS: u64 = 60_000;

fn provider_kind(name: Option<&str>) -> Result<ProviderKind> {
    let name = name.ok_or_else(|| anyhow!("provider not configured"))?;
    ProviderKind::parse(name).ok_or_else(|| anyhow!("unknown provider '{name}'"))
}

/// The OCR model handle, or `None` when no OCR section is configured.
pub fn build_ocr(config: &ReceiptflowConfig) -> Result<Option<Arc<dyn OcrEngine>>> {
    let Some(ocr) = &config.ocr else {
        return Ok(None);
    };
    let kind = provider_kind(ocr.provider.as_deref())?;
    let api_key = ocr.api_key.clone().unwrap_or_default();

    let mut provider = VisionProvider::new(kind, api_key);
    if let Some(model) = &ocr.model {
        provider = provider.with_model(model.clone());
    }
    if let Some(url) = &ocr.base_url {
        provider = provider.with_base_url(url.clone());
    }
    Ok(Some(Arc::new(VisionOcr::new(provider))))
}

pub fn retry_policy(config: &ReceiptflowConfig) -> RetryPolicy {
    let extraction = config.extraction.clone().unwrap_or_default();
    let max_attempts = extraction.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
    let delay_ms = extraction.backoff_ms.unwrap_or(DEFAULT_BACKOFF_MS);

    let backoff = match extraction.backoff_factor {
        _ if delay_ms == 0 => Backoff::None,
        Some(factor) if factor > 1.0 => Backoff::Exponential {
            base_ms: delay_ms,
            factor,
            max_ms: MAX_BACKOFF_MS,
        },
        _ => Backoff::Fixed { delay_ms },
    };
    RetryPolicy { max_attempts, backoff }
}

pub fn build_pipeline(config: &ReceiptflowConfig) -> Result<Pipeline> {
    let extractor_cfg = config.extractor.clone().unwrap_or_default();
    let mut extractor = LlmFieldExtractor::new(
        provider_kind(extractor_cfg.provider.as_deref())?,
        extractor_cfg.fields.clone(),
    );
    if let Some(model) = extractor_cfg.model {
        extractor = extractor.with_model(model);
    }
    if let Some(url) = extractor_cfg.base_url {
        extractor = extractor.with_base_url(url);
    }

    let rec = config.recommender.clone().unwrap_or_default();
    let products = CoPurchaseRecommender::new(
        rec.product_column.clone().unwrap_or_else(|| DEFAULT_PRODUCT_COLUMN.to_string()),
        rec.top_n.unwrap_or(DEFAULT_TOP_N),
    );
    let proximity = CheapNearbyRecommender::new(
        OfferColumns {
            product: rec.product_column.unwrap_or_else(|| DEFAULT_PRODUCT_COLUMN.to_string()),
            price: rec.price_column.unwrap_or_else(|| DEFAULT_PRICE_COLUMN.to_string()),
            store: rec.store_column,
        },
        rec.max_distance_km.unwrap_or(DEFAULT_MAX_DISTANCE_KM),
    );

    let quiet = config
        .dataset
        .as_ref()
        .and_then(|d| d.quiet_parse)
        .unwrap_or(true);

    Ok(Pipeline::new(Arc::new(extractor), Arc::new(products), Arc::new(proximity))
        .with_retry(retry_policy(config))
        .with_load_options(LoadOptions { quiet }))
}
