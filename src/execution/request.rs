//! Full request pipeline: interceptors, URL/header resolution, dispatch,
//! classification, and the single 401 refresh-and-retry round.

use crate::auth::AuthManager;
use crate::cancel::CancelHandle;
use crate::config::{ClientConfig, Resolver};
use crate::error::Error;
use crate::execution::classify::classify;
use crate::execution::dispatch::dispatch;
use crate::execution::headers::resolve_headers;
use crate::execution::url::build_url;
use crate::interceptor::{generate_request_id, RequestContext, RequestInterceptor};
use crate::transport::HttpTransport;
use crate::types::{ApiRequest, ApiResult};
use std::sync::Arc;

/// Execute one logical API call end to end.
///
/// The original attempt and its optional 401 retry share one request id; the
/// retry re-resolves headers against a config whose token source is replaced
/// by the refreshed token, and runs at most once. When the refresh fails, the
/// original 401 error is surfaced untouched.
pub async fn execute(
    config: &ClientConfig,
    transport: &dyn HttpTransport,
    interceptors: &[Arc<dyn RequestInterceptor>],
    auth: Option<&AuthManager>,
    request: &ApiRequest,
    cancel: &CancelHandle,
) -> Result<ApiResult, Error> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    // Mock/short-circuit pass. A failing interceptor counts as "not handled".
    for interceptor in interceptors {
        if let Ok(Some(result)) = interceptor.handle(request) {
            tracing::debug!(target: "apiline::http", url=%request.url, "request handled by interceptor");
            return Ok(result);
        }
    }

    let url = build_url(config, request);
    let ctx = RequestContext {
        request_id: generate_request_id(),
        method: request.method,
        url: url.clone(),
    };

    let outcome = attempt(config, transport, request, &url, cancel).await;
    let outcome = match (outcome, auth) {
        (Err(error), Some(auth))
            if request.retry_on_unauthorized && error.status() == Some(401) =>
        {
            match auth.refresh_access_token().await {
                Some(token) => {
                    for interceptor in interceptors {
                        interceptor.on_retry(&ctx, &error, 1);
                    }
                    let retry_config = config.clone().with_token(Resolver::value(token));
                    attempt(&retry_config, transport, request, &url, cancel).await
                }
                // Refresh failed: the session is gone, the original
                // unauthorized error stands.
                None => Err(error),
            }
        }
        (outcome, _) => outcome,
    };

    match &outcome {
        Ok(result) => {
            for interceptor in interceptors {
                interceptor.on_response(&ctx, result);
            }
        }
        Err(error) => {
            for interceptor in interceptors {
                interceptor.on_error(&ctx, error);
            }
        }
    }
    outcome
}

/// One resolve-dispatch-classify round.
async fn attempt(
    config: &ClientConfig,
    transport: &dyn HttpTransport,
    request: &ApiRequest,
    url: &str,
    cancel: &CancelHandle,
) -> Result<ApiResult, Error> {
    let headers = resolve_headers(config, request).await?;
    let result = dispatch(transport, request, url, headers, cancel).await?;
    classify(request, &result)?;
    Ok(result)
}
