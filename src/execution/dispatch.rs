//! Transport dispatch and response normalization.

use crate::cancel::CancelHandle;
use crate::error::Error;
use crate::execution::body::effective_payload;
use crate::transport::{HttpTransport, TransportRequest, TransportResponse};
use crate::types::{ApiRequest, ApiResult};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde_json::Value;

/// Send one attempt through the transport, racing it against cancellation.
///
/// A delivered HTTP response, error status or not, becomes an [`ApiResult`];
/// transport failures and cancellation propagate as errors. When the handle
/// fires, the in-flight transport future is dropped, which aborts the
/// underlying connection.
pub async fn dispatch(
    transport: &dyn HttpTransport,
    request: &ApiRequest,
    url: &str,
    headers: HeaderMap,
    cancel: &CancelHandle,
) -> Result<ApiResult, Error> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let (body, form) = effective_payload(request);
    let transport_request = TransportRequest {
        method: request.method,
        url: url.to_string(),
        headers,
        body,
        form,
    };

    let response = tokio::select! {
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        result = transport.execute(transport_request) => result?,
    };

    Ok(normalize_response(request, url, response))
}

/// Normalize a transport response into an [`ApiResult`]: 204 always yields a
/// null body, and `response_header` mode substitutes a header value for the
/// parsed payload.
fn normalize_response(
    request: &ApiRequest,
    url: &str,
    response: TransportResponse,
) -> ApiResult {
    let body = if response.status == 204 {
        Value::Null
    } else if let Some(header_value) = request
        .response_header
        .as_deref()
        .and_then(|name| response.headers.get(name))
        .and_then(|value| value.to_str().ok())
    {
        Value::String(header_value.to_string())
    } else {
        parse_body(&response.body)
    };

    ApiResult::new(url, response.status, response.status_text, body)
}

// JSON when it parses, text when it doesn't, null when empty.
fn parse_body(bytes: &Bytes) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(_) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reqwest::header::HeaderValue;
    use std::time::Duration;

    struct CannedTransport {
        response: TransportResponse,
    }

    #[async_trait]
    impl HttpTransport for CannedTransport {
        async fn execute(&self, _request: TransportRequest) -> Result<TransportResponse, Error> {
            Ok(self.response.clone())
        }
    }

    struct HangingTransport;

    #[async_trait]
    impl HttpTransport for HangingTransport {
        async fn execute(&self, _request: TransportRequest) -> Result<TransportResponse, Error> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            unreachable!("transport should have been cancelled")
        }
    }

    fn canned(status: u16, body: &'static [u8]) -> CannedTransport {
        CannedTransport {
            response: TransportResponse {
                status,
                status_text: String::new(),
                headers: HeaderMap::new(),
                body: Bytes::from_static(body),
            },
        }
    }

    #[tokio::test]
    async fn no_content_always_yields_null_body() {
        let transport = canned(204, b"{\"ignored\": true}");
        let request = ApiRequest::get("/x");
        let result = dispatch(
            &transport,
            &request,
            "https://api.example.com/x",
            HeaderMap::new(),
            &CancelHandle::new(),
        )
        .await
        .unwrap();
        assert_eq!(result.status, 204);
        assert_eq!(result.body, Value::Null);
    }

    #[tokio::test]
    async fn response_header_mode_substitutes_body() {
        let mut transport = canned(201, b"{\"id\": 1}");
        transport.response.headers.insert(
            "location",
            HeaderValue::from_static("/tasks/1"),
        );
        let request = ApiRequest::post("/tasks").with_response_header("location");
        let result = dispatch(
            &transport,
            &request,
            "https://api.example.com/tasks",
            HeaderMap::new(),
            &CancelHandle::new(),
        )
        .await
        .unwrap();
        assert_eq!(result.body, Value::String("/tasks/1".into()));
    }

    #[tokio::test]
    async fn missing_response_header_falls_back_to_parsed_body() {
        let transport = canned(200, b"{\"id\": 1}");
        let request = ApiRequest::get("/tasks").with_response_header("location");
        let result = dispatch(
            &transport,
            &request,
            "https://api.example.com/tasks",
            HeaderMap::new(),
            &CancelHandle::new(),
        )
        .await
        .unwrap();
        assert_eq!(result.body["id"], 1);
    }

    #[tokio::test]
    async fn error_statuses_are_results_not_errors() {
        let transport = canned(404, b"{\"detail\": \"missing\"}");
        let request = ApiRequest::get("/x");
        let result = dispatch(
            &transport,
            &request,
            "https://api.example.com/x",
            HeaderMap::new(),
            &CancelHandle::new(),
        )
        .await
        .unwrap();
        assert!(!result.ok);
        assert_eq!(result.status, 404);
        assert_eq!(result.body["detail"], "missing");
    }

    #[tokio::test]
    async fn non_json_bodies_come_back_as_text() {
        let transport = canned(200, b"plain text");
        let request = ApiRequest::get("/x");
        let result = dispatch(
            &transport,
            &request,
            "https://api.example.com/x",
            HeaderMap::new(),
            &CancelHandle::new(),
        )
        .await
        .unwrap();
        assert_eq!(result.body, Value::String("plain text".into()));
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_dispatch() {
        let cancel = CancelHandle::new();
        let request = ApiRequest::get("/slow");

        let handle = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        let outcome = dispatch(
            &HangingTransport,
            &request,
            "https://api.example.com/slow",
            HeaderMap::new(),
            &cancel,
        )
        .await;
        assert!(matches!(outcome, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn already_cancelled_handle_short_circuits() {
        let cancel = CancelHandle::new();
        cancel.cancel();
        let outcome = dispatch(
            &HangingTransport,
            &ApiRequest::get("/x"),
            "https://api.example.com/x",
            HeaderMap::new(),
            &cancel,
        )
        .await;
        assert!(matches!(outcome, Err(Error::Cancelled)));
    }
}
