//! `receiptflow-pipeline`: one receipt in, nearby recommendations out.
//!
//! Stages run strictly in order: load dataset, validate input, extract the
//! record (with bounded retry), reconcile columns, snapshot and append,
//! then call the recommenders against the updated dataset.

pub mod extraction;
pub mod pipeline;
pub mod recommend;
pub mod reconcile;
pub mod retry;
pub mod validation;

#[cfg(test)]
mod fakes;

pub use extraction::{extract_record, is_retryable, AttemptError, ExtractionRequest};
pub use pipeline::{Pipeline, RunRequest};
pub use recommend::invoke_recommenders;
pub use reconcile::{reconcile, require_complete};
pub use retry::{retry_if, Backoff, RetryError, RetryPolicy};
pub use validation::{require_model, validate_coordinates, validate_email, validate_uid};
