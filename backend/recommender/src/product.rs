//! Co-purchase product recommender.
//!
//! Ranks products bought by users who share at least one product with the
//! target user, skipping what the target already bought. Falls back to
//! global popularity when there is no overlap.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use receiptflow_core::ProductRecommender;
use receiptflow_dataset::{load, LoadOptions, Table};
use tracing::debug;

pub struct CoPurchaseRecommender {
    product_column: String,
    top_n: usize,
}

impl CoPurchaseRecommender {
    pub fn new(product_column: impl Into<String>, top_n: usize) -> Self {
        Self {
            product_column: product_column.into(),
            top_n,
        }
    }

    /// Rank candidates for `uid` from an already-loaded table.
    pub fn rank(&self, table: &Table, uid: &str) -> Result<Vec<String>> {
        let uid_idx = table
            .column_index("uid")
            .ok_or_else(|| anyhow!("dataset has no 'uid' column"))?;
        let product_idx = table
            .column_index(&self.product_column)
            .ok_or_else(|| anyhow!("dataset has no '{}' column", self.product_column))?;

        let purchases: Vec<(&str, &str)> = table
            .rows()
            .iter()
            .filter_map(|row| Some((row[uid_idx].as_deref()?, row[product_idx].as_deref()?)))
            .collect();

        let owned: HashSet<&str> = purchases
            .iter()
            .filter(|(u, _)| *u == uid)
            .map(|(_, p)| *p)
            .collect();
        let neighbours: HashSet<&str> = purchases
            .iter()
            .filter(|(u, p)| *u != uid && owned.contains(p))
            .map(|(u, _)| *u)
            .collect();

        let mut scores = count_products(
            purchases
                .iter()
                .filter(|(u, p)| neighbours.contains(u) && !owned.contains(p)),
        );
        if scores.is_empty() {
            debug!(uid, "No co-purchase overlap; using global popularity");
            scores = count_products(purchases.iter().filter(|(_, p)| !owned.contains(p)));
        }

        let mut ranked: Vec<(&str, usize)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| match b.1.cmp(&a.1) {
            Ordering::Equal => a.0.cmp(b.0),
            other => other,
        });
        Ok(ranked
            .into_iter()
            .take(self.top_n)
            .map(|(p, _)| p.to_string())
            .collect())
    }
}

fn count_products<'a>(purchases: impl Iterator<Item = &'a (&'a str, &'a str)>) -> HashMap<&'a str, usize> {
    let mut counts = HashMap::new();
    for (_, product) in purchases {
        *counts.entry(*product).or_insert(0) += 1;
    }
    counts
}

#[async_trait]
impl ProductRecommender for CoPurchaseRecommender {
    async fn recommend(&self, dataset_path: &Path, uid: &str) -> Result<Vec<String>> {
        let table = load(dataset_path, LoadOptions { quiet: true }).await?;
        self.rank(&table, uid)
    }
}
