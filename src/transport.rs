//! HTTP transport abstraction.
//!
//! The pipeline talks to an injectable transport so tests and embedders can
//! observe the final URL/headers/body or return synthetic responses without
//! going through `reqwest`. A delivered HTTP response comes back as a
//! [`TransportResponse`] whatever its status; only genuine transport failures
//! (DNS, connection reset, timeout) are errors.

use crate::error::Error;
use crate::execution::body::build_multipart_form;
use crate::types::{Body, FormValue, Method};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;

/// Transport-level request data.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    /// Resolved request payload; wins over `form` when both are set.
    pub body: Option<Body>,
    /// Declarative multipart fields; the transport builds the actual form so
    /// the request stays rebuildable for the 401 retry.
    pub form: Option<Vec<(String, FormValue)>>,
}

/// Transport-level response data.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Injectable HTTP transport.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, Error>;
}

/// Default transport backed by a shared `reqwest::Client`.
///
/// Cookie/credential policies belong to the injected `reqwest::Client`
/// itself.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport reusing an existing client (connection pools, proxies).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, Error> {
        let mut builder = self
            .client
            .request(request.method.into(), &request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = match body {
                Body::Json(value) => {
                    let bytes =
                        serde_json::to_vec(&value).map_err(|e| Error::Parse(e.to_string()))?;
                    builder.body(bytes)
                }
                Body::Text(text) => builder.body(text),
                Body::Bytes { data, .. } => builder.body(data),
            };
        } else if let Some(fields) = request.form {
            builder = builder.multipart(build_multipart_form(&fields)?);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}
