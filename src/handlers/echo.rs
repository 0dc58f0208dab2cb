use axum::{
    body::Bytes,
    http::{header, HeaderMap},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::{now_rfc3339, AppError};

#[derive(Debug, Serialize)]
pub struct EchoResponse {
    pub received: Value,
    pub timestamp: String,
    pub headers: BTreeMap<String, String>,
}

// ─── POST /api/echo ──────────────────────────────────────────────
/// Echoes the JSON body back. Bodies that are empty or not declared as
/// JSON are treated as `{}`; only a declared-but-malformed JSON body is
/// rejected.

pub async fn echo(headers: HeaderMap, body: Bytes) -> Result<Json<EchoResponse>, AppError> {
    let received = parse_body(&headers, &body)?;

    // Non-UTF-8 header values are dropped rather than mangled
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect();

    Ok(Json(EchoResponse {
        received,
        timestamp: now_rfc3339(),
        headers,
    }))
}

fn parse_body(headers: &HeaderMap, body: &[u8]) -> Result<Value, AppError> {
    if !is_json(headers) || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))
}

/// `application/json`, optionally with parameters, or any `+json` suffix type.
fn is_json(headers: &HeaderMap) -> bool {
    let Some(mime) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
    else {
        return false;
    };
    let mime = mime.trim().to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}
