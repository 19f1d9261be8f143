//! Auth and header resolution.
//!
//! Header precedence, later wins: base headers (`Accept`, `Accept-Language`)
//! -> resolved extra headers -> descriptor headers -> authorization ->
//! inferred Content-Type. Multipart payloads own their boundary, so any
//! explicit Content-Type is stripped for form requests.

use crate::config::ClientConfig;
use crate::error::Error;
use crate::types::{ApiRequest, Body};
use base64::Engine;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Resolve all dynamic credential/header sources for one request and build
/// the final header map. The four resolvers run concurrently.
pub async fn resolve_headers(
    config: &ClientConfig,
    request: &ApiRequest,
) -> Result<HeaderMap, Error> {
    let (token, username, password, extras) = tokio::try_join!(
        config.token.resolve(request),
        config.username.resolve(request),
        config.password.resolve(request),
        config.extra_headers.resolve(request),
    )?;

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(language) = &config.accept_language {
        insert_header(&mut headers, ACCEPT_LANGUAGE.as_str(), language)?;
    }

    for (name, value) in extras.unwrap_or_default() {
        insert_header(&mut headers, &name, &value)?;
    }
    for (name, value) in &request.headers {
        insert_header(&mut headers, name, value)?;
    }

    // Bearer first; basic overrides it only when both credentials resolved.
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        insert_header(&mut headers, AUTHORIZATION.as_str(), &format!("Bearer {token}"))?;
    }
    if let (Some(user), Some(pass)) = (
        username.filter(|u| !u.is_empty()),
        password.filter(|p| !p.is_empty()),
    ) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
        insert_header(&mut headers, AUTHORIZATION.as_str(), &format!("Basic {encoded}"))?;
    }

    if !headers.contains_key(CONTENT_TYPE) {
        if let Some(content_type) = infer_content_type(request) {
            insert_header(&mut headers, CONTENT_TYPE.as_str(), &content_type)?;
        }
    }

    // Multipart must own its boundary-based Content-Type.
    if request.body.is_none() && request.form.is_some() {
        headers.remove(CONTENT_TYPE);
    }

    Ok(headers)
}

/// Content-Type inference when the descriptor leaves it unset. Form payloads
/// never get one; the transport's boundary header wins.
fn infer_content_type(request: &ApiRequest) -> Option<String> {
    if let Some(media_type) = &request.media_type {
        return Some(media_type.clone());
    }
    match &request.body {
        Some(Body::Bytes { content_type, .. }) => Some(
            content_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        ),
        Some(Body::Text(_)) => Some("text/plain".to_string()),
        Some(Body::Json(_)) => Some("application/json".to_string()),
        None => None,
    }
}

/// Insert a header by string name/value. Empty values are dropped rather
/// than serialized; invalid names/values are configuration errors.
pub fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Ok(());
    }
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::Configuration(format!("invalid header name '{name}': {e}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| Error::Configuration(format!("invalid header value: {e}")))?;
    headers.insert(name, value);
    Ok(())
}
