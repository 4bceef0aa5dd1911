//! Log Redaction
//!
//! Scrubs e-mail local parts, API keys, and bearer tokens from strings prior to logging.

use once_cell::sync::Lazy;
use regex::Regex;

static API_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9\-_]{20,})|(AIza[0-9A-Za-z\-_]{35})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)|(key=[0-9A-Za-z\-_]{20,})")
        .unwrap()
});

/// Redacts credentials in a string (e.g. an upstream error body).
pub fn redact_sensitive_data(input: &str) -> String {
    API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]").to_string()
}

/// Keep the first character of the local part and the full domain.
///
/// `jane.doe@example.com` becomes `j***@example.com`.
pub fn redact_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}
