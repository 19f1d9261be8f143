//! Request payload resolution.
//!
//! Multipart forms are described declaratively ([`FormValue`]) and built
//! fresh per dispatch attempt; `reqwest::multipart::Form` is not cloneable,
//! and the 401 retry needs to rebuild the body.

use crate::error::Error;
use crate::types::{ApiRequest, Body, FormValue};

/// Effective payload for a dispatch attempt. `body` takes precedence over
/// `form` when both are set on the descriptor.
pub fn effective_payload(
    request: &ApiRequest,
) -> (Option<Body>, Option<Vec<(String, FormValue)>>) {
    if request.body.is_some() {
        (request.body.clone(), None)
    } else {
        (None, request.form.clone())
    }
}

/// Build a `reqwest` multipart form from declarative fields.
///
/// Null entries are dropped before arrays are expanded; arrays expand to one
/// part per element under the same key; structured values are
/// JSON-stringified.
pub fn build_multipart_form(
    fields: &[(String, FormValue)],
) -> Result<reqwest::multipart::Form, Error> {
    let mut form = reqwest::multipart::Form::new();
    for (key, value) in fields {
        form = append_field(form, key, value)?;
    }
    Ok(form)
}

fn append_field(
    mut form: reqwest::multipart::Form,
    key: &str,
    value: &FormValue,
) -> Result<reqwest::multipart::Form, Error> {
    match value {
        FormValue::Null => Ok(form),
        FormValue::Many(items) => {
            for item in items {
                form = append_field(form, key, item)?;
            }
            Ok(form)
        }
        FormValue::Text(text) => Ok(form.text(key.to_string(), text.clone())),
        FormValue::Json(value) => {
            let text = serde_json::to_string(value).map_err(|e| Error::Parse(e.to_string()))?;
            Ok(form.text(key.to_string(), text))
        }
        FormValue::Bytes {
            data,
            file_name,
            content_type,
        } => {
            let mut part = reqwest::multipart::Part::bytes(data.to_vec());
            if let Some(name) = file_name {
                part = part.file_name(name.clone());
            }
            if let Some(mime) = content_type {
                part = part.mime_str(mime).map_err(|e| {
                    Error::Configuration(format!("invalid form part content type '{mime}': {e}"))
                })?;
            }
            Ok(form.part(key.to_string(), part))
        }
    }
}
