//! Session lifecycle manager with single-flight refresh.
//!
//! The manager owns the persisted token pair and the refresh coordinator.
//! When concurrent 401s arrive, the first caller starts the refresh and every
//! other caller awaits the same shared future; the coordinator is torn down
//! once the refresh settles so a later 401 can refresh again.

use super::{TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::error::Error;
use async_trait::async_trait;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Wire shape of a single token value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEnvelope {
    pub token: String,
}

/// Wire shape of a login response: both tokens, or the login is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<TokenEnvelope>,
    #[serde(default)]
    pub refresh_token: Option<TokenEnvelope>,
}

/// Collaborator contract for the refresh endpoint: exchange a refresh token
/// for a new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenEnvelope, Error>;
}

type SharedRefresh = Shared<BoxFuture<'static, Option<String>>>;

/// Auth token lifecycle manager.
pub struct AuthManager {
    store: Arc<dyn TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
    in_flight: Mutex<Option<SharedRefresh>>,
}

impl AuthManager {
    pub fn new(store: Arc<dyn TokenStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            store,
            refresher,
            in_flight: Mutex::new(None),
        }
    }

    /// Currently persisted access token, if any.
    pub fn access_token(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    /// Currently persisted refresh token, if any.
    pub fn refresh_token(&self) -> Option<String> {
        self.store.get(REFRESH_TOKEN_KEY)
    }

    /// Whether a session is currently established.
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Persist a login response after structural validation. A response
    /// missing either token clears any stale session and fails; partial
    /// state is never stored.
    pub fn store_login(&self, response: &LoginResponse) -> Result<(), Error> {
        match (&response.access_token, &response.refresh_token) {
            (Some(access), Some(refresh))
                if !access.token.is_empty() && !refresh.token.is_empty() =>
            {
                self.store.set(ACCESS_TOKEN_KEY, &access.token);
                self.store.set(REFRESH_TOKEN_KEY, &refresh.token);
                Ok(())
            }
            _ => {
                self.clear();
                Err(Error::Auth("login response missing token pair".into()))
            }
        }
    }

    /// Drop the session: both tokens removed.
    pub fn clear(&self) {
        self.store.remove(ACCESS_TOKEN_KEY);
        self.store.remove(REFRESH_TOKEN_KEY);
    }

    /// Current bearer value for the header resolver. When no access token is
    /// cached, a refresh is attempted first; an empty string means "no
    /// credentials" to the resolver.
    pub async fn bearer_token(&self) -> String {
        if let Some(token) = self.access_token() {
            return token;
        }
        self.refresh_access_token().await.unwrap_or_default()
    }

    /// Single-flight refresh. Returns the new access token, or `None` when
    /// the refresh failed (session cleared). Concurrent callers share one
    /// refresh call; each still retries its own original request.
    pub async fn refresh_access_token(&self) -> Option<String> {
        let refresh = {
            let mut guard = self.in_flight.lock().await;
            match guard.as_ref() {
                Some(in_flight) => in_flight.clone(),
                None => {
                    let store = self.store.clone();
                    let refresher = self.refresher.clone();
                    let refresh: SharedRefresh =
                        do_refresh(store, refresher).boxed().shared();
                    *guard = Some(refresh.clone());
                    refresh
                }
            }
        };

        let token = refresh.clone().await;

        // Whichever caller settles first tears the coordinator down. The
        // starter may have been dropped mid-flight, so teardown cannot be its
        // job alone; the ptr_eq guard keeps a newer refresh in the slot
        // untouched.
        let mut guard = self.in_flight.lock().await;
        if guard.as_ref().is_some_and(|current| current.ptr_eq(&refresh)) {
            *guard = None;
        }
        token
    }
}

async fn do_refresh(
    store: Arc<dyn TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
) -> Option<String> {
    let Some(refresh_token) = store.get(REFRESH_TOKEN_KEY) else {
        tracing::debug!(target: "apiline::auth", "no refresh token; clearing session");
        store.remove(ACCESS_TOKEN_KEY);
        store.remove(REFRESH_TOKEN_KEY);
        return None;
    };

    match refresher.refresh(&refresh_token).await {
        Ok(envelope) if !envelope.token.is_empty() => {
            store.set(ACCESS_TOKEN_KEY, &envelope.token);
            tracing::debug!(target: "apiline::auth", "access token refreshed");
            Some(envelope.token)
        }
        Ok(_) => {
            tracing::debug!(target: "apiline::auth", "refresh returned empty token; clearing session");
            store.remove(ACCESS_TOKEN_KEY);
            store.remove(REFRESH_TOKEN_KEY);
            None
        }
        Err(error) => {
            tracing::debug!(target: "apiline::auth", err=%error, "token refresh failed; clearing session");
            store.remove(ACCESS_TOKEN_KEY);
            store.remove(REFRESH_TOKEN_KEY);
            None
        }
    }
}
