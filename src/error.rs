//! Error types for the request pipeline.
//!
//! All failures are per-call; nothing in this crate is fatal to the process.
//! Classified HTTP failures surface as [`Error::Api`], genuine transport
//! failures (DNS, connection reset, timeout, cancellation) keep their own
//! variants and are never run through the classifier.

use serde_json::Value;

/// A classified HTTP failure carrying enough of the originating request and
/// response for diagnostics.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} (status {status} {status_text}, url: {url})")]
pub struct ApiError {
    /// Fully resolved request URL.
    pub url: String,
    /// HTTP status code of the offending response.
    pub status: u16,
    /// HTTP status text of the offending response.
    pub status_text: String,
    /// Response body as delivered (may be `Null`).
    pub body: Value,
    /// Classification label or generated fallback message.
    pub message: String,
}

/// Library error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Classified HTTP error (status in the merged table, or a non-2xx
    /// response without a label).
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Transport-level failure: the server never delivered a response.
    #[error("HTTP transport error: {0}")]
    Transport(String),

    /// The request was cancelled via its cancel handle.
    #[error("request cancelled")]
    Cancelled,

    /// Authentication/session failure outside the HTTP pipeline, e.g. a
    /// structurally invalid login response.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Invalid configuration, header name/value, or resolver output.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Failed to encode a request payload or decode a response payload.
    #[error("parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Status code of the underlying HTTP response, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(e) => Some(e.status),
            _ => None,
        }
    }

    /// Whether this error is the terminal cancellation marker.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Canonical label for a status code in the default classification table.
///
/// Per-request `errors` overrides are merged on top of this table by the
/// classifier; overrides win.
pub fn default_error_label(status: u16) -> Option<&'static str> {
    match status {
        400 => Some("Bad Request"),
        401 => Some("Unauthorized"),
        403 => Some("Forbidden"),
        404 => Some("Not Found"),
        500 => Some("Internal Server Error"),
        502 => Some("Bad Gateway"),
        503 => Some("Service Unavailable"),
        _ => None,
    }
}
