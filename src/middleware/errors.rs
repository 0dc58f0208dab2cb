use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::handlers::ErrorBody;
use crate::AppState;

/// Outside production, re-render error responses with their internal
/// message so developers see what went wrong. In production the opaque
/// body produced by `AppError` goes out untouched.
pub async fn reveal_error_detail(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;
    if !state.config.environment.exposes_error_detail() {
        return response;
    }

    let Some(detailed) = response.extensions().get::<ErrorBody>() else {
        return response;
    };
    let json = match serde_json::to_vec(detailed) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "could not serialize detailed error body");
            return response;
        }
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(json))
}
