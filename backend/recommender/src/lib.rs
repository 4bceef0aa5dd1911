pub mod product;
pub mod proximity;

pub use product::CoPurchaseRecommender;
pub use proximity::{CheapNearbyRecommender, OfferColumns};
