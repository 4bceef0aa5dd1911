pub mod error;
pub mod traits;
pub mod types;

pub use error::{ExtractError, PipelineError};
pub use traits::{FieldExtractor, OcrEngine, ProductRecommender, ProximityRecommender};
pub use types::{GeoPoint, OcrOutput, Recommendation, RecommendationResult};
