use std::path::PathBuf;
use std::sync::Arc;

use receiptflow_core::{
    FieldExtractor, GeoPoint, OcrEngine, PipelineError, ProductRecommender, ProximityRecommender,
    RecommendationResult,
};
use receiptflow_dataset::{load, AppendTransaction, LoadOptions};
use receiptflow_logging::redact_email;
use tracing::{info, info_span, Instrument};

use crate::extraction::{extract_record, ExtractionRequest};
use crate::recommend::invoke_recommenders;
use crate::reconcile::{reconcile, require_complete};
use crate::retry::RetryPolicy;
use crate::validation::{require_model, validate_coordinates, validate_email, validate_uid};

/// Caller-supplied parameters of one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub key_path: PathBuf,
    pub image_path: PathBuf,
    pub dataset_path: PathBuf,
    pub uid: String,
    pub email: String,
    pub origin: GeoPoint,
}

/// The receipt pipeline with its collaborators wired in.
///
/// A run assumes exclusive access to the dataset file; concurrent runs
/// against the same path must be serialized by the caller.
pub struct Pipeline {
    extractor: Arc<dyn FieldExtractor>,
    products: Arc<dyn ProductRecommender>,
    proximity: Arc<dyn ProximityRecommender>,
    retry: RetryPolicy,
    load_options: LoadOptions,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn FieldExtractor>,
        products: Arc<dyn ProductRecommender>,
        proximity: Arc<dyn ProximityRecommender>,
    ) -> Self {
        Self {
            extractor,
            products,
            proximity,
            retry: RetryPolicy::default(),
            load_options: LoadOptions { quiet: true },
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_load_options(mut self, options: LoadOptions) -> Self {
        self.load_options = options;
        self
    }

    /// Run every stage in order and return the recommendations.
    ///
    /// A failure after the dataset commit (i.e. in the recommenders) still
    /// leaves the dataset updated.
    pub async fn run(
        &self,
        request: &RunRequest,
        model: Option<&dyn OcrEngine>,
    ) -> Result<RecommendationResult, PipelineError> {
        let span = info_span!("run", uid = %request.uid, email = %redact_email(&request.email));
        self.run_stages(request, model).instrument(span).await
    }

    async fn run_stages(
        &self,
        request: &RunRequest,
        model: Option<&dyn OcrEngine>,
    ) -> Result<RecommendationResult, PipelineError> {
        let dataset = load(&request.dataset_path, self.load_options).await?;

        validate_email(&request.email)?;
        validate_uid(&request.uid)?;
        validate_coordinates(&request.origin)?;
        let ocr = require_model(model)?;

        let record = extract_record(
            ocr,
            self.extractor.as_ref(),
            ExtractionRequest {
                image_path: &request.image_path,
                key_path: &request.key_path,
                uid: &request.uid,
                email: &request.email,
            },
            &self.retry,
        )
        .await?;

        reconcile(&dataset, &record)?;
        require_complete(&record)?;

        let tx = AppendTransaction::begin(&request.dataset_path).await?;
        let appended = record.len();
        let updated = tx.append(dataset, record).await?;
        info!(appended, total = updated.len(), "Dataset committed");

        invoke_recommenders(
            self.products.as_ref(),
            self.proximity.as_ref(),
            &request.dataset_path,
            &request.uid,
            request.origin,
        )
        .await
    }
}
