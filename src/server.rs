use axum::{
    handler::HandlerWithoutStateExt,
    middleware as axum_mw,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::handlers::{self, AppError};
use crate::metrics::stream;
use crate::middleware::{errors, telemetry};
use crate::AppState;

/// Builds the full Axum `Router` with all routes, middleware, and static serving.
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(handlers::system::not_found.into_service());

    let routes = Router::new()
        // ── Pages / service info ────────────────────────────────
        .route("/", get(handlers::system::index))
        .route("/welcome", get(handlers::system::welcome))
        .route("/health", get(handlers::system::health))
        .route("/error", get(handlers::system::fail))
        // ── Mock data API ───────────────────────────────────────
        .route("/api/data", get(handlers::data::get_data))
        .route("/api/echo", post(handlers::echo::echo))
        .route("/api/simulate-load", get(handlers::data::simulate_load))
        // ── Telemetry read paths ────────────────────────────────
        .route("/metrics", get(stream::get_metrics))
        .route("/api/stats", get(stream::get_stats))
        .route("/api/stats/stream", get(stream::stats_stream))
        // ── Provide shared state to all routes above ────────────
        .with_state(state.clone())
        // ── Serve static/ directory for the dashboard ───────────
        .fallback_service(static_files);

    with_telemetry(routes, state).layer(CorsLayer::permissive())
}

/// Wraps `router` in the telemetry stack (applied bottom-up):
/// panic capture innermost, then error-detail rendering, then the
/// instrumentation middleware outermost so it sees the final status.
pub fn with_telemetry(router: Router, state: Arc<AppState>) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            errors::reveal_error_detail,
        ))
        .layer(axum_mw::from_fn_with_state(state, telemetry::instrument))
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let msg = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else {
        "unknown panic payload".to_owned()
    };
    AppError::Panic(msg).into_response()
}
