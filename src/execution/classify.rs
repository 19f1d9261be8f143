//! Error classification.
//!
//! Maps a dispatch result's status through the default status -> label table
//! merged with per-call overrides. A table match beats the generic non-2xx
//! fallback, and the error path itself never fails: an unserializable body
//! degrades to `undefined` in the generated message.

use crate::error::{default_error_label, ApiError, Error};
use crate::types::{ApiRequest, ApiResult};

/// Classify one dispatch result. Returns `Ok(())` for a successful result
/// whose status has no label; otherwise the typed [`ApiError`].
pub fn classify(request: &ApiRequest, result: &ApiResult) -> Result<(), Error> {
    let label = request
        .errors
        .get(&result.status)
        .map(String::as_str)
        .or_else(|| default_error_label(result.status));

    if let Some(label) = label {
        return Err(api_error(result, label.to_string()));
    }

    if !result.ok {
        let body = serde_json::to_string(&result.body)
            .unwrap_or_else(|_| "undefined".to_string());
        let message = format!(
            "Generic Error: status: {}; status text: {}; body: {}",
            result.status, result.status_text, body
        );
        return Err(api_error(result, message));
    }

    Ok(())
}

fn api_error(result: &ApiResult, message: String) -> Error {
    Error::Api(ApiError {
        url: result.url.clone(),
        status: result.status,
        status_text: result.status_text.clone(),
        body: result.body.clone(),
        message,
    })
}
