//! Client configuration and dynamic value resolvers.
//!
//! Credentials and extra headers may be supplied as literal values,
//! synchronous functions of the request descriptor, or async functions. All
//! three shapes go through the single [`Resolver::resolve`] helper so call
//! sites never care which one they were given.

use crate::error::Error;
use crate::types::ApiRequest;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Synchronous resolver function.
pub type SyncResolverFn<T> = Arc<dyn Fn(&ApiRequest) -> Result<T, Error> + Send + Sync>;
/// Asynchronous resolver function.
pub type AsyncResolverFn<T> =
    Arc<dyn Fn(&ApiRequest) -> BoxFuture<'static, Result<T, Error>> + Send + Sync>;
/// Pluggable path-segment encoder.
pub type PathEncoder = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// A statically-or-dynamically supplied configuration value.
#[derive(Default)]
pub enum Resolver<T> {
    /// Nothing supplied; resolves to `None`.
    #[default]
    None,
    /// Literal value.
    Value(T),
    /// Synchronous function of the request descriptor.
    Sync(SyncResolverFn<T>),
    /// Async function of the request descriptor.
    Async(AsyncResolverFn<T>),
}

impl<T: Clone> Resolver<T> {
    /// Literal resolver.
    pub fn value(value: T) -> Self {
        Resolver::Value(value)
    }

    /// Resolver backed by a synchronous function.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<T, Error> + Send + Sync + 'static,
    {
        Resolver::Sync(Arc::new(f))
    }

    /// Resolver backed by an async function.
    pub fn from_async<F>(f: F) -> Self
    where
        F: Fn(&ApiRequest) -> BoxFuture<'static, Result<T, Error>> + Send + Sync + 'static,
    {
        Resolver::Async(Arc::new(f))
    }

    /// Resolve the value for the given request, uniformly across all shapes.
    pub async fn resolve(&self, request: &ApiRequest) -> Result<Option<T>, Error> {
        match self {
            Resolver::None => Ok(None),
            Resolver::Value(v) => Ok(Some(v.clone())),
            Resolver::Sync(f) => f(request).map(Some),
            Resolver::Async(f) => f(request).await.map(Some),
        }
    }

    /// Whether a value was supplied at all.
    pub fn is_none(&self) -> bool {
        matches!(self, Resolver::None)
    }
}

impl<T: Clone> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        match self {
            Resolver::None => Resolver::None,
            Resolver::Value(v) => Resolver::Value(v.clone()),
            Resolver::Sync(f) => Resolver::Sync(f.clone()),
            Resolver::Async(f) => Resolver::Async(f.clone()),
        }
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self {
            Resolver::None => "None",
            Resolver::Value(_) => "Value",
            Resolver::Sync(_) => "Sync",
            Resolver::Async(_) => "Async",
        };
        f.debug_tuple("Resolver").field(&shape).finish()
    }
}

/// Whole-URI-safe encoder: percent-encodes everything except unreserved and
/// reserved URI characters, leaving `/`, `?`, `:` etc. intact. This is the
/// default path encoder; swap in `urlencoding::encode` for strict per-segment
/// encoding.
pub fn encode_uri(input: &str) -> String {
    const KEEP: &[char] = &[
        ';', ',', '/', '?', ':', '@', '&', '=', '+', '$', '-', '_', '.', '!', '~', '*', '\'', '(',
        ')', '#',
    ];
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() || KEEP.contains(&c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    out
}

/// Immutable per-call client configuration.
///
/// Cloned for the 401 retry with the token resolver overridden by the
/// post-refresh token; everything else stays as configured.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL the resolved request path is appended to.
    pub base_url: String,
    /// Value substituted for the reserved `{api-version}` placeholder.
    pub api_version: String,
    /// Bearer token source.
    pub token: Resolver<String>,
    /// Basic-auth username source.
    pub username: Resolver<String>,
    /// Basic-auth password source.
    pub password: Resolver<String>,
    /// Additional headers merged over the base headers.
    pub extra_headers: Resolver<Vec<(String, String)>>,
    /// Base `Accept-Language` header, when set.
    pub accept_language: Option<String>,
    /// Encoder applied to substituted path parameter values.
    pub path_encoder: PathEncoder,
}

impl ClientConfig {
    /// Configuration for the given base URL with defaults: API version `"1"`,
    /// no credentials, whole-URI-safe path encoding.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_version: "1".to_string(),
            token: Resolver::None,
            username: Resolver::None,
            password: Resolver::None,
            extra_headers: Resolver::None,
            accept_language: None,
            path_encoder: Arc::new(encode_uri),
        }
    }

    /// Set the `{api-version}` substitution value.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set the bearer token source.
    pub fn with_token(mut self, token: Resolver<String>) -> Self {
        self.token = token;
        self
    }

    /// Set the basic-auth username source.
    pub fn with_username(mut self, username: Resolver<String>) -> Self {
        self.username = username;
        self
    }

    /// Set the basic-auth password source.
    pub fn with_password(mut self, password: Resolver<String>) -> Self {
        self.password = password;
        self
    }

    /// Set the extra-headers source.
    pub fn with_extra_headers(mut self, headers: Resolver<Vec<(String, String)>>) -> Self {
        self.extra_headers = headers;
        self
    }

    /// Set the base `Accept-Language` header.
    pub fn with_accept_language(mut self, language: impl Into<String>) -> Self {
        self.accept_language = Some(language.into());
        self
    }

    /// Replace the path parameter encoder.
    pub fn with_path_encoder<F>(mut self, encoder: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.path_encoder = Arc::new(encoder);
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("token", &self.token)
            .field("username", &self.username)
            .field("password", &self.password)
            .field("extra_headers", &self.extra_headers)
            .field("accept_language", &self.accept_language)
            .finish_non_exhaustive()
    }
}
