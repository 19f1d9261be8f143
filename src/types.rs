//! Core request/response value types.
//!
//! [`ApiRequest`] is the declarative description of one intended call: verb,
//! URL template, parameters, and per-call error labels. It carries no
//! transport state and can be rebuilt/dispatched more than once (the 401
//! retry path relies on this).

use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;

/// HTTP method for a request descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    /// Uppercase method string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(value: Method) -> Self {
        match value {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload.
///
/// The variant determines the inferred Content-Type when the descriptor does
/// not set one explicitly: JSON -> `application/json`, text -> `text/plain`,
/// bytes -> the payload's own content type or `application/octet-stream`.
#[derive(Debug, Clone)]
pub enum Body {
    /// JSON body, passed through unmodified.
    Json(Value),
    /// Raw text scalar.
    Text(String),
    /// Binary payload with an optional content type of its own.
    Bytes {
        data: Bytes,
        content_type: Option<String>,
    },
}

/// One multipart form field value.
///
/// `Null` entries are dropped before arrays are expanded; arrays expand to
/// repeated keys; `Json` values are stringified before appending.
#[derive(Debug, Clone)]
pub enum FormValue {
    /// Plain text field, appended as-is.
    Text(String),
    /// File/blob field, appended as-is.
    Bytes {
        data: Bytes,
        file_name: Option<String>,
        content_type: Option<String>,
    },
    /// Structured value, JSON-stringified before appending.
    Json(Value),
    /// Repeated field: expanded to one part per element under the same key.
    Many(Vec<FormValue>),
    /// Absent value, dropped entirely.
    Null,
}

/// Declarative description of one API call, prior to resolution.
///
/// `path` keys should cover every `{placeholder}` in `url`; placeholders
/// without a matching key are left verbatim in the final URL (non-fatal).
/// `body` and `form` are mutually exclusive per call; `body` wins at the
/// dispatch layer if both are set.
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    pub method: Method,
    /// URL template with `{name}` placeholders, including the reserved
    /// `{api-version}`. Appended to the configured base URL.
    pub url: String,
    /// Path parameters, substituted into the template via the configured
    /// path encoder.
    pub path: Vec<(String, Value)>,
    /// Query parameters; iteration order is preserved in the query string.
    pub query: Vec<(String, Value)>,
    /// Request payload.
    pub body: Option<Body>,
    /// Multipart form fields.
    pub form: Option<Vec<(String, FormValue)>>,
    /// Descriptor-supplied headers (override resolved extra headers).
    pub headers: Vec<(String, String)>,
    /// Explicit Content-Type, wins over payload-based inference.
    pub media_type: Option<String>,
    /// When set and present in the response, this header's value becomes the
    /// result body instead of the parsed payload.
    pub response_header: Option<String>,
    /// Per-call status -> label overrides merged over the default table.
    pub errors: HashMap<u16, String>,
    /// Whether a 401 response may trigger the refresh-and-retry protocol.
    /// Login/refresh endpoints set this to `false` to avoid recursion.
    pub retry_on_unauthorized: bool,
}

impl ApiRequest {
    /// New descriptor for the given method and URL template.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            retry_on_unauthorized: true,
            ..Default::default()
        }
    }

    /// GET request descriptor.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// POST request descriptor.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// PUT request descriptor.
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    /// PATCH request descriptor.
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::Patch, url)
    }

    /// DELETE request descriptor.
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    /// Add a path parameter.
    pub fn with_path(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.path.push((name.into(), value.into()));
        self
    }

    /// Add a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Set a JSON body.
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    /// Set an arbitrary payload.
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a multipart form field.
    pub fn with_form_field(mut self, name: impl Into<String>, value: FormValue) -> Self {
        self.form.get_or_insert_with(Vec::new).push((name.into(), value));
        self
    }

    /// Add a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set an explicit Content-Type.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Use a response header as the result body.
    pub fn with_response_header(mut self, name: impl Into<String>) -> Self {
        self.response_header = Some(name.into());
        self
    }

    /// Override or extend the status -> label table for this call.
    pub fn with_error(mut self, status: u16, label: impl Into<String>) -> Self {
        self.errors.insert(status, label.into());
        self
    }

    /// Opt out of the 401 refresh-and-retry protocol (auth endpoints).
    pub fn without_unauthorized_retry(mut self) -> Self {
        self.retry_on_unauthorized = false;
        self
    }
}

/// Outcome of one dispatch attempt. Created once per attempt (original and,
/// if retried, again for the retry); never mutated.
#[derive(Debug, Clone)]
pub struct ApiResult {
    /// Fully resolved request URL.
    pub url: String,
    /// `true` iff status is in [200, 300).
    pub ok: bool,
    /// HTTP status code.
    pub status: u16,
    /// HTTP status text.
    pub status_text: String,
    /// Parsed response body (`Null` for 204 or empty bodies), or the value of
    /// the descriptor's `response_header` when that mode is active.
    pub body: Value,
}

impl ApiResult {
    /// Build a result for the given status, deriving `ok`.
    pub fn new(url: impl Into<String>, status: u16, status_text: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            ok: (200..300).contains(&status),
            status,
            status_text: status_text.into(),
            body,
        }
    }
}
