use std::path::Path;

use receiptflow_core::{GeoPoint, PipelineError, ProductRecommender, ProximityRecommender, RecommendationResult};
use tracing::info;

/// Candidate products first, then nearby offers for those candidates.
///
/// Any collaborator failure surfaces as `PipelineError::Recommendation`.
pub async fn invoke_recommenders(
    products: &dyn ProductRecommender,
    proximity: &dyn ProximityRecommender,
    dataset_path: &Path,
    uid: &str,
    origin: GeoPoint,
) -> Result<RecommendationResult, PipelineError> {
    let candidates = products
        .recommend(dataset_path, uid)
        .await
        .map_err(PipelineError::Recommendation)?;
    info!(uid, candidates = candidates.len(), "Product candidates ready");

    let result = proximity
        .recommend_nearby(dataset_path, uid, &candidates, origin)
        .await
        .map_err(PipelineError::Recommendation)?;
    info!(uid, items = result.items.len(), "Nearby recommendations ready");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeRecommender;

    #[tokio::test]
    async fn passes_candidates_to_proximity() {
        let rec = FakeRecommender::with_products(&["milk", "eggs"]);
        let origin = GeoPoint::new(106.8, -6.2);

        let result = invoke_recommenders(&rec, &rec, Path::new("d.csv"), "u1", origin).await.unwrap();
        assert_eq!(result.candidates, vec!["milk", "eggs"]);

        let nearby = rec.nearby_calls.lock().unwrap();
        assert_eq!(nearby[0].2, vec!["milk".to_string(), "eggs".to_string()]);
        assert_eq!(nearby[0].3, origin);
    }

    #[tokio::test]
    async fn failures_are_wrapped() {
        let rec = FakeRecommender { fail: true, ..Default::default() };
        let err = invoke_recommenders(&rec, &rec, Path::new("d.csv"), "u1", GeoPoint::new(0.0, 0.0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "recommendation");
    }

    #[tokio::test]
    async fn product_failure_skips_proximity() {
        let rec = FakeRecommender { fail_products: true, ..Default::default() };
        let err = invoke_recommenders(&rec, &rec, Path::new("d.csv"), "u1", GeoPoint::new(0.0, 0.0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "recommendation");
        assert!(err.to_string().contains("product model not trained"));
        assert_eq!(rec.product_calls.lock().unwrap().len(), 1);
        assert!(rec.nearby_calls.lock().unwrap().is_empty());
    }
}
