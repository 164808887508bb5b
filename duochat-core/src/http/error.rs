//! Mapping of HTTP responses to failure classifications

use crate::providers::adapter::Classification;
use serde_json::Value;

/// Classify a non-success status.
///
/// Returns `None` for 2xx so the adapter can parse its own success body.
/// 429 and 5xx are retryable; every other status is fatal.
pub fn classify_status(status: u16, body: &str) -> Option<Classification> {
    if (200..300).contains(&status) {
        return None;
    }

    let reason = failure_reason(status, body);
    if status == 429 || (500..600).contains(&status) {
        Some(Classification::RetryableFailure(reason))
    } else {
        Some(Classification::FatalFailure(reason))
    }
}

/// Human-readable reason for a failed response: the provider's own error
/// message when the body carries one, otherwise the status code.
pub fn failure_reason(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| extract_error_message(&json))
        .unwrap_or_else(|| format!("HTTP error! status: {}", status))
}

/// Extract `error.message` (or a bare string `error`) from a JSON body
pub fn extract_error_message(json: &Value) -> Option<String> {
    match json.get("error")? {
        Value::Object(error) => error
            .get("message")
            .and_then(|v| v.as_str())
            .filter(|m| !m.is_empty())
            .map(str::to_string),
        Value::String(message) if !message.is_empty() => Some(message.clone()),
        _ => None,
    }
}
