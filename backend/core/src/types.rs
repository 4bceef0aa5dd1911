use serde::{Deserialize, Serialize};

/// Raw OCR result for one receipt image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrOutput {
    /// Transcribed text, line breaks preserved.
    pub text: String,
    /// Engine that produced the text (e.g. "gemini").
    pub engine: String,
}

/// A longitude/latitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Great-circle distance in kilometres.
    pub fn haversine_km(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// One recommended offer near the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub product: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    pub location: GeoPoint,
    pub distance_km: f64,
}

/// Final output of a run, scoped to one user and one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult {
    pub uid: String,
    pub origin: GeoPoint,
    /// Candidates from the product recommender, in ranked order.
    pub candidates: Vec<String>,
    pub items: Vec<Recommendation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_for_same_point() {
        let p = GeoPoint::new(106.8, -6.2);
        assert!(p.haversine_km(&p) < 1e-9);
    }

    #[test]
    fn haversine_one_degree_latitude() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0);
        let d = a.haversine_km(&b);
        assert!((d - 111.19).abs() < 0.1, "got {d}");
    }
}
