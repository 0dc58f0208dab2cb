pub mod data;
pub mod echo;
pub mod system;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("no route for {path}")]
    NotFound { path: String },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("handler panicked: {0}")]
    Panic(String),
}

/// JSON error envelope. The full body (with `message`) also rides along in
/// the response extensions so `reveal_error_detail` can decide, per
/// environment, whether the client gets to see it.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub timestamp: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) | Self::Panic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Internal(_) | Self::Panic(_) => "INTERNAL_ERROR",
        }
    }

    fn headline(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "Route not found",
            Self::BadRequest(_) => "Bad request",
            Self::Internal(_) | Self::Panic(_) => "Internal server error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let detailed = ErrorBody {
            error: self.headline(),
            code: self.code(),
            message: Some(match &self {
                Self::NotFound { path } => format!("no route for {path}"),
                Self::BadRequest(msg) | Self::Internal(msg) | Self::Panic(msg) => msg.clone(),
            }),
            path: match &self {
                Self::NotFound { path } => Some(path.clone()),
                _ => None,
            },
            timestamp: now_rfc3339(),
        };

        // Client errors describe the client's mistake; server errors stay opaque
        let public = ErrorBody {
            message: match self {
                Self::BadRequest(_) => detailed.message.clone(),
                _ => None,
            },
            ..detailed.clone()
        };

        let mut response = (status, Json(public)).into_response();
        response.extensions_mut().insert(detailed);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn internal_error_hides_message() {
        let response = AppError::Internal("db password leaked".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<ErrorBody>().is_some());

        let json = body_json(response).await;
        assert_eq!(json["code"], "INTERNAL_ERROR");
        assert_eq!(json["error"], "Internal server error");
        assert!(json.get("message").is_none());
        assert!(json.get("timestamp").is_some());
    }

    #[tokio::test]
    async fn not_found_carries_path() {
        let response = AppError::NotFound { path: "/nope".into() }.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["path"], "/nope");
    }

    #[tokio::test]
    async fn bad_request_keeps_message() {
        let json = body_json(AppError::BadRequest("expected object".into()).into_response()).await;
        assert_eq!(json["message"], "expected object");
    }
}
