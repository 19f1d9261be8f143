//! apiline: a typed HTTP request pipeline with session-aware authentication.
//!
//! The crate turns a declarative [`ApiRequest`] into a dispatched HTTP call:
//! URL templating and query serialization, concurrent credential resolution,
//! cancelable in-flight handles, status classification against a per-call
//! error table, and a single transparent refresh-and-retry round on 401.
//!
//! ```no_run
//! use apiline::{ApiRequest, Client, ClientConfig};
//!
//! # async fn run() -> Result<(), apiline::Error> {
//! let client = Client::new(ClientConfig::new("https://api.example.com"));
//! let task = client
//!     .execute(ApiRequest::get("/v{api-version}/tasks/{id}").with_path("id", 7))
//!     .await?;
//! println!("{}", task.body);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod auth;
pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod execution;
pub mod interceptor;
pub mod transport;
pub mod types;

pub use auth::{AuthManager, LoginResponse, MemoryTokenStore, TokenEnvelope, TokenRefresher, TokenStore};
pub use cancel::{CancelHandle, CancelableRequest, RequestSlot};
pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, Resolver};
pub use error::{ApiError, Error};
pub use interceptor::{LoggingInterceptor, RequestContext, RequestInterceptor};
pub use transport::{HttpTransport, ReqwestTransport, TransportRequest, TransportResponse};
pub use types::{ApiRequest, ApiResult, Body, FormValue, Method};

/// Crate result alias.
pub type Result<T> = std::result::Result<T, Error>;
