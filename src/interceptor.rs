//! Request interceptors.
//!
//! Interceptors can short-circuit the pipeline with a substitute result
//! (mock responses), observe retries, responses and errors. Hooks are
//! best-effort: a failure inside `handle` is swallowed and treated as
//! "not handled, continue to network".

use crate::error::Error;
use crate::types::{ApiRequest, ApiResult, Method};

/// Context passed to interceptor hooks describing the request.
#[derive(Clone, Debug)]
pub struct RequestContext {
    /// Correlation id for this logical call (shared between the original
    /// attempt and its 401 retry).
    pub request_id: String,
    pub method: Method,
    pub url: String,
}

/// Generate a correlation id for a request.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Request interceptor trait.
pub trait RequestInterceptor: Send + Sync {
    /// Offer the request before any network work. Returning `Ok(Some(..))`
    /// short-circuits the pipeline entirely; the transport and error
    /// classifier are bypassed and the substitute result's body is delivered
    /// as the call's value. Errors are swallowed by the pipeline.
    fn handle(&self, _request: &ApiRequest) -> Result<Option<ApiResult>, Error> {
        Ok(None)
    }

    /// Called before the single 401 retry, with the original classified error.
    fn on_retry(&self, _ctx: &RequestContext, _error: &Error, _attempt: u32) {}

    /// Called after a successfully classified response.
    fn on_response(&self, _ctx: &RequestContext, _result: &ApiResult) {}

    /// Called when the call settles with an error.
    fn on_error(&self, _ctx: &RequestContext, _error: &Error) {}
}

/// A simple logging interceptor backed by `tracing` (no sensitive data).
#[derive(Clone, Default)]
pub struct LoggingInterceptor;

impl RequestInterceptor for LoggingInterceptor {
    fn on_retry(&self, ctx: &RequestContext, error: &Error, attempt: u32) {
        tracing::debug!(target: "apiline::http", request_id=%ctx.request_id, method=%ctx.method, url=%ctx.url, err=%error, attempt, "retrying after refresh");
    }

    fn on_response(&self, ctx: &RequestContext, result: &ApiResult) {
        tracing::debug!(target: "apiline::http", request_id=%ctx.request_id, method=%ctx.method, url=%ctx.url, status=%result.status, "response received");
    }

    fn on_error(&self, ctx: &RequestContext, error: &Error) {
        tracing::debug!(target: "apiline::http", request_id=%ctx.request_id, method=%ctx.method, url=%ctx.url, err=%error, "request error");
    }
}
