//! URL assembly: path-template substitution and query-string serialization.

use crate::config::ClientConfig;
use crate::types::ApiRequest;
use serde_json::Value;

/// Resolve the descriptor's URL template against the configuration.
///
/// Every `{name}` token with a matching path parameter (and the reserved
/// `{api-version}`) is replaced with its encoded value. Placeholders without
/// a matching key are left verbatim; this is deliberate, templating callers
/// rely on it.
pub fn build_url(config: &ClientConfig, request: &ApiRequest) -> String {
    let mut path = request.url.replace(
        "{api-version}",
        &(config.path_encoder)(&config.api_version),
    );

    for (name, value) in &request.path {
        let token = format!("{{{name}}}");
        if path.contains(&token) {
            path = path.replace(&token, &(config.path_encoder)(&scalar_to_string(value)));
        }
    }

    let base = config.base_url.trim_end_matches('/');
    let mut url = if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    };

    let query = build_query_string(&request.query);
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query);
    }
    url
}

/// Serialize query parameters, preserving input order.
///
/// Arrays repeat the key once per element, nested objects use bracket
/// notation (`key[sub]=v`), and null values are omitted entirely.
pub fn build_query_string(query: &[(String, Value)]) -> String {
    let mut parts = Vec::new();
    for (key, value) in query {
        append_pair(&mut parts, key, value);
    }
    parts.join("&")
}

fn append_pair(parts: &mut Vec<String>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                append_pair(parts, key, item);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                append_pair(parts, &format!("{key}[{sub}]"), item);
            }
        }
        other => {
            parts.push(format!(
                "{}={}",
                encode_query_key(key),
                urlencoding::encode(&scalar_to_string(other))
            ));
        }
    }
}

// Bracket markers stay literal so nested keys read as `filter[a]`.
fn encode_query_key(key: &str) -> String {
    urlencoding::encode(key)
        .replace("%5B", "[")
        .replace("%5D", "]")
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
