//! Scripted collaborators for tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use receiptflow_core::{
    ExtractError, FieldExtractor, GeoPoint, OcrEngine, OcrOutput, ProductRecommender,
    ProximityRecommender, RecommendationResult,
};

#[derive(Default)]
pub struct FakeOcr {
    fail: bool,
    calls: AtomicU32,
}

impl FakeOcr {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for FakeOcr {
    fn name(&self) -> &str {
        "fake"
    }

    async fn recognize(&self, image_path: &Path) -> Result<OcrOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("model crashed on {}", image_path.display()));
        }
        Ok(OcrOutput {
            text: "TOTAL 12.50".to_string(),
            engine: "fake".to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Row(serde_json::Value),
    Malformed,
    Fail(String),
}

pub struct FakeExtractor {
    replies: Mutex<VecDeque<Reply>>,
    calls: AtomicU32,
}

impl FakeExtractor {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FieldExtractor for FakeExtractor {
    async fn extract(
        &self,
        _ocr: &OcrOutput,
        _key_path: &Path,
        _uid: &str,
        _email: &str,
    ) -> Result<serde_json::Value, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Row(value)) => Ok(value),
            Some(Reply::Malformed) => {
                Err(serde_json::from_str::<serde_json::Value>("{\"uid\": \"u1\",").unwrap_err().into())
            }
            Some(Reply::Fail(message)) => Err(anyhow!(message).into()),
            None => Err(anyhow!("no scripted reply").into()),
        }
    }
}

/// Records every call; returns a fixed candidate list.
#[derive(Default)]
pub struct FakeRecommender {
    pub products: Vec<String>,
    /// Fail `recommend`.
    pub fail_products: bool,
    /// Fail `recommend_nearby`.
    pub fail: bool,
    pub product_calls: Mutex<Vec<(PathBuf, String)>>,
    pub nearby_calls: Mutex<Vec<(PathBuf, String, Vec<String>, GeoPoint)>>,
}

impl FakeRecommender {
    pub fn with_products(products: &[&str]) -> Self {
        Self {
            products: products.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ProductRecommender for FakeRecommender {
    async fn recommend(&self, dataset_path: &Path, uid: &str) -> Result<Vec<String>> {
        self.product_calls
            .lock()
            .unwrap()
            .push((dataset_path.to_path_buf(), uid.to_string()));
        if self.fail_products {
            return Err(anyhow!("product model not trained"));
        }
        Ok(self.products.clone())
    }
}

#[async_trait]
impl ProximityRecommender for FakeRecommender {
    async fn recommend_nearby(
        &self,
        dataset_path: &Path,
        uid: &str,
        products: &[String],
        origin: GeoPoint,
    ) -> Result<RecommendationResult> {
        self.nearby_calls.lock().unwrap().push((
            dataset_path.to_path_buf(),
            uid.to_string(),
            products.to_vec(),
            origin,
        ));
        if self.fail {
            return Err(anyhow!("distance service unavailable"));
        }
        Ok(RecommendationResult {
            uid: uid.to_string(),
            origin,
            candidates: products.to_vec(),
            items: Vec::new(),
        })
    }
}
