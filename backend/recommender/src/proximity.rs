//! Cheapest-nearby offer recommender.
//!
//! For each candidate product, picks the cheapest offer recorded within a
//! radius of the user, breaking price ties by distance.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use receiptflow_core::{GeoPoint, ProximityRecommender, Recommendation, RecommendationResult};
use receiptflow_dataset::{load, LoadOptions, Table};
use tracing::debug;

/// Dataset columns describing an offer.
#[derive(Debug, Clone)]
pub struct OfferColumns {
    pub product: String,
    pub price: String,
    pub store: Option<String>,
}

impl Default for OfferColumns {
    fn default() -> Self {
        Self {
            product: "product".to_string(),
            price: "price".to_string(),
            store: None,
        }
    }
}

pub struct CheapNearbyRecommender {
    columns: OfferColumns,
    max_distance_km: f64,
}

impl CheapNearbyRecommender {
    pub fn new(columns: OfferColumns, max_distance_km: f64) -> Self {
        Self {
            columns,
            max_distance_km,
        }
    }

    pub fn select(
        &self,
        table: &Table,
        uid: &str,
        products: &[String],
        origin: GeoPoint,
    ) -> Result<RecommendationResult> {
        let column = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| anyhow!("dataset has no '{name}' column"))
        };
        let product_idx = column(self.columns.product.as_str())?;
        let price_idx = column(self.columns.price.as_str())?;
        let long_idx = column("long")?;
        let lat_idx = column("lat")?;
        let store_idx = match &self.columns.store {
            Some(name) => Some(column(name.as_str())?),
            None => None,
        };

        let mut best: HashMap<&str, Recommendation> = HashMap::new();
        for row in table.rows() {
            let Some(product) = row[product_idx].as_deref() else { continue };
            if !products.iter().any(|p| p == product) {
                continue;
            }
            let (Some(price), Some(lon), Some(lat)) = (
                parse_f64(&row[price_idx]),
                parse_f64(&row[long_idx]),
                parse_f64(&row[lat_idx]),
            ) else {
                debug!(product, "Skipping offer with non-numeric price or coordinates");
                continue;
            };

            let location = GeoPoint::new(lon, lat);
            let distance_km = origin.haversine_km(&location);
            if distance_km > self.max_distance_km {
                continue;
            }

            let offer = Recommendation {
                product: product.to_string(),
                price,
                store: store_idx.and_then(|i| row[i].clone()),
                location,
                distance_km,
            };
            let replace = best
                .get(product)
                .map_or(true, |current| cheaper_or_closer(&offer, current) == Ordering::Less);
            if replace {
                best.insert(product, offer);
            }
        }

        let mut items: Vec<Recommendation> = best.into_values().collect();
        items.sort_by(cheaper_or_closer);

        Ok(RecommendationResult {
            uid: uid.to_string(),
            origin,
            candidates: products.to_vec(),
            items,
        })
    }
}

fn parse_f64(cell: &Option<String>) -> Option<f64> {
    cell.as_deref()?.trim().parse().ok().filter(|v: &f64| v.is_finite())
}

fn cheaper_or_closer(a: &Recommendation, b: &Recommendation) -> Ordering {
    a.price
        .partial_cmp(&b.price)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.distance_km.partial_cmp(&b.distance_km).unwrap_or(Ordering::Equal))
}

#[async_trait]
impl ProximityRecommender for CheapNearbyRecommender {
    async fn recommend_nearby(
        &self,
        dataset_path: &Path,
        uid: &str,
        products: &[String],
        origin: GeoPoint,
    ) -> Result<RecommendationResult> {
        let table = load(dataset_path, LoadOptions { quiet: true }).await?;
        self.select(&table, uid, products, origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offers() -> Table {
        Table::from_rows(
            &["uid", "long", "lat", "product", "price", "store"],
            &[
                &["a", "106.800", "-6.200", "milk", "1.50", "Near Mart"],
                &["b", "106.801", "-6.201", "milk", "1.20", "Corner"],
                &["c", "107.500", "-6.900", "milk", "0.80", "Far Away"],
                &["d", "106.805", "-6.205", "eggs", "2.00", "Near Mart"],
                &["e", "106.802", "-6.200", "eggs", "2.00", "Closer"],
                &["f", "106.800", "-6.200", "soap", "0.10", "Near Mart"],
                &["g", "106.800", "-6.200", "bread", "n/a", "Near Mart"],
            ],
        )
        .unwrap()
    }

    fn recommender() -> CheapNearbyRecommender {
        let columns = OfferColumns {
            store: Some("store".to_string()),
            ..Default::default()
        };
        CheapNearbyRecommender::new(columns, 10.0)
    }

    #[test]
    fn picks_cheapest_within_radius() {
        let candidates = vec!["milk".to_string(), "eggs".to_string(), "bread".to_string()];
        let result = recommender()
            .select(&offers(), "u1", &candidates, GeoPoint::new(106.8, -6.2))
            .unwrap();

        let picked: Vec<(&str, Option<&str>)> = result
            .items
            .iter()
            .map(|r| (r.product.as_str(), r.store.as_deref()))
            .collect();
        assert_eq!(picked, vec![("milk", Some("Corner")), ("eggs", Some("Closer"))]);
        assert!(result.items.iter().all(|r| r.distance_km <= 10.0));
        assert_eq!(result.candidates, candidates);
    }

    #[test]
    fn no_candidates_means_no_items() {
        let result = recommender()
            .select(&offers(), "u1", &[], GeoPoint::new(106.8, -6.2))
            .unwrap();
        assert!(result.items.is_empty());
    }

    #[test]
    fn missing_price_column_is_an_error() {
        let rec = CheapNearbyRecommender::new(
            OfferColumns {
                price: "cost".to_string(),
                ..Default::default()
            },
            5.0,
        );
        assert!(rec.select(&offers(), "u1", &[], GeoPoint::new(0.0, 0.0)).is_err());
    }
}
