//! High-level client facade.
//!
//! A [`Client`] bundles configuration, transport, interceptors, and an
//! optional auth session into one cloneable handle. Calls run through the
//! execution pipeline; [`Client::submit`] returns a cancelable in-flight
//! handle instead of awaiting inline.

use crate::auth::{AuthManager, LoginResponse, TokenEnvelope, TokenRefresher, TokenStore};
use crate::cancel::{CancelHandle, CancelableRequest};
use crate::config::{ClientConfig, Resolver};
use crate::error::Error;
use crate::execution::request::execute;
use crate::interceptor::RequestInterceptor;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{ApiRequest, ApiResult};
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::json;
use std::sync::Arc;

struct ClientInner {
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    auth: Option<Arc<AuthManager>>,
}

/// API client. Cheap to clone; clones share transport and auth session.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Client over the default reqwest transport with no auth session.
    pub fn new(config: ClientConfig) -> Self {
        Self::builder(config).build()
    }

    /// Start building a client.
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder {
            config,
            transport: None,
            interceptors: Vec::new(),
            auth_store: None,
            refresh_path: "/auth/refresh".to_string(),
            refresher: None,
        }
    }

    /// The auth session manager, when one is configured.
    pub fn auth(&self) -> Option<&AuthManager> {
        self.inner.auth.as_deref()
    }

    /// Execute a request to completion, awaiting inline.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResult, Error> {
        self.execute_with(request, &CancelHandle::new()).await
    }

    /// Execute a request under an externally owned cancel handle.
    pub async fn execute_with(
        &self,
        request: ApiRequest,
        cancel: &CancelHandle,
    ) -> Result<ApiResult, Error> {
        let config = self.effective_config();
        execute(
            &config,
            self.inner.transport.as_ref(),
            &self.inner.interceptors,
            self.inner.auth.as_deref(),
            &request,
            cancel,
        )
        .await
    }

    /// Start a request and return a cancelable handle to its outcome.
    ///
    /// Cancelling the returned handle aborts the in-flight network call; a
    /// settlement racing the cancellation is discarded.
    pub fn submit(&self, request: ApiRequest) -> CancelableRequest<ApiResult> {
        let (pending, slot) = CancelableRequest::channel();
        let client = self.clone();
        tokio::spawn(async move {
            let cancel = slot.handle();
            match client.execute_with(request, &cancel).await {
                Ok(result) => slot.resolve(result),
                Err(error) => slot.reject(error),
            }
        });
        pending
    }

    /// Log in through the given request and persist the returned token pair.
    ///
    /// The request is forced out of the 401 retry protocol. The raw result is
    /// returned so callers can inspect the rest of the login payload.
    pub async fn login(&self, request: ApiRequest) -> Result<ApiResult, Error> {
        let auth = self
            .inner
            .auth
            .as_deref()
            .ok_or_else(|| Error::Configuration("client has no auth session".into()))?;

        let result = self.execute(request.without_unauthorized_retry()).await?;
        let response: LoginResponse = serde_json::from_value(result.body.clone())
            .map_err(|e| Error::Parse(format!("malformed login response: {e}")))?;
        auth.store_login(&response)?;
        Ok(result)
    }

    /// Drop the current session's tokens, if an auth session is configured.
    pub fn logout(&self) {
        if let Some(auth) = &self.inner.auth {
            auth.clear();
        }
    }

    // When no explicit token source is configured and a session exists, the
    // session supplies the bearer token (refreshing lazily when the access
    // token is absent).
    fn effective_config(&self) -> ClientConfig {
        let mut config = self.inner.config.clone();
        if config.token.is_none()
            && let Some(auth) = &self.inner.auth
        {
            let auth = auth.clone();
            config.token = Resolver::from_async(move |_req: &ApiRequest| {
                let auth = auth.clone();
                async move { Ok(auth.bearer_token().await) }.boxed()
            });
        }
        config
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("interceptors", &self.inner.interceptors.len())
            .field("auth", &self.inner.auth.is_some())
            .finish()
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    auth_store: Option<Arc<dyn TokenStore>>,
    refresh_path: String,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl ClientBuilder {
    /// Replace the transport (tests inject mocks here).
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Append a request interceptor. Interceptors run in registration order.
    pub fn interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Enable the auth session, backed by the given token store and the
    /// default endpoint refresher.
    pub fn auth_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.auth_store = Some(store);
        self
    }

    /// Path of the refresh endpoint used by the default refresher.
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Replace the token refresher (requires `auth_store`).
    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn build(self) -> Client {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));

        let auth = self.auth_store.map(|store| {
            let refresher = self.refresher.unwrap_or_else(|| {
                Arc::new(EndpointRefresher {
                    config: self.config.clone(),
                    transport: transport.clone(),
                    path: self.refresh_path,
                })
            });
            Arc::new(AuthManager::new(store, refresher))
        });

        Client {
            inner: Arc::new(ClientInner {
                config: self.config,
                transport,
                interceptors: self.interceptors,
                auth,
            }),
        }
    }
}

/// Default refresher: exchanges the refresh token at a configured endpoint.
///
/// Runs outside the 401 retry protocol and without the auth session, so a
/// failing refresh can never recurse into another refresh.
struct EndpointRefresher {
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
    path: String,
}

#[async_trait]
impl TokenRefresher for EndpointRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenEnvelope, Error> {
        let request = ApiRequest::post(&self.path)
            .with_json(json!({ "refreshToken": refresh_token }))
            .without_unauthorized_retry();

        let result = execute(
            &self.config,
            self.transport.as_ref(),
            &[],
            None,
            &request,
            &CancelHandle::new(),
        )
        .await?;

        serde_json::from_value(result.body)
            .map_err(|e| Error::Parse(format!("malformed refresh response: {e}")))
    }
}
