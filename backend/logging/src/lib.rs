//! Structured logging for receiptflow.
//!
//! Console output plus optional NDJSON file rotation, and redaction helpers
//! that keep e-mail addresses and credentials out of log lines.

pub mod logger;
pub mod redact;

pub use logger::init_logger;
pub use redact::{redact_email, redact_sensitive_data};
