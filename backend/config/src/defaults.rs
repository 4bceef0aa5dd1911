//! Config defaults: fills unset values after parsing.

use crate::schema::{
    DatasetConfig, ExtractionConfig, ExtractorConfig, LoggingConfig, ReceiptflowConfig,
    RecommenderConfig,
};

/// One first attempt plus three retries.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_BACKOFF_MS: u64 = 0;
pub const DEFAULT_EXTRACTOR_PROVIDER: &str = "gemini";
pub const DEFAULT_PRODUCT_COLUMN: &str = "product";
pub const DEFAULT_PRICE_COLUMN: &str = "price";
pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 10.0;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
///
/// The OCR section is left alone: no section means no model.
pub fn apply_all_defaults(mut config: ReceiptflowConfig) -> ReceiptflowConfig {
    let dataset = config.dataset.get_or_insert_with(DatasetConfig::default);
    dataset.quiet_parse.get_or_insert(true);

    let extraction = config.extraction.get_or_insert_with(ExtractionConfig::default);
    extraction.max_attempts.get_or_insert(DEFAULT_MAX_ATTEMPTS);
    extraction.backoff_ms.get_or_insert(DEFAULT_BACKOFF_MS);

    let extractor = config.extractor.get_or_insert_with(ExtractorConfig::default);
    extractor
        .provider
        .get_or_insert_with(|| DEFAULT_EXTRACTOR_PROVIDER.to_string());

    let recommender = config.recommender.get_or_insert_with(RecommenderConfig::default);
    recommender
        .product_column
        .get_or_insert_with(|| DEFAULT_PRODUCT_COLUMN.to_string());
    recommender
        .price_column
        .get_or_insert_with(|| DEFAULT_PRICE_COLUMN.to_string());
    recommender.top_n.get_or_insert(DEFAULT_TOP_N);
    recommender.max_distance_km.get_or_insert(DEFAULT_MAX_DISTANCE_KM);

    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.json.get_or_insert(false);

    config
}
