use axum::{
    extract::State,
    http::Uri,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::config::Environment;
use crate::metrics::MemoryUsage;
use crate::AppState;

use super::{now_rfc3339, AppError};

#[derive(Debug, Serialize)]
pub struct Welcome {
    pub message: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub uptime: f64,
    pub timestamp: String,
    pub environment: &'static str,
    /// `null` on platforms without a process collector
    pub memory: Option<MemoryUsage>,
}

fn welcome_body() -> Welcome {
    Welcome {
        message: "Welcome to the dashboard",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now_rfc3339(),
    }
}

// ─── GET / ───────────────────────────────────────────────────────
/// The dashboard page. Under the test environment there is no static
/// directory to rely on, so the welcome JSON stands in for it.

pub async fn index(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    if state.config.environment == Environment::Test {
        return Ok(Json(welcome_body()).into_response());
    }

    let path = state.config.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Ok(Html(html).into_response()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "dashboard index.html missing");
            Err(AppError::NotFound { path: "/".into() })
        }
        Err(e) => Err(AppError::Internal(format!("reading {}: {e}", path.display()))),
    }
}

// ─── GET /welcome ────────────────────────────────────────────────

pub async fn welcome() -> Json<Welcome> {
    Json(welcome_body())
}

// ─── GET /health ─────────────────────────────────────────────────

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "healthy",
        uptime: state.stats.uptime_secs(),
        timestamp: now_rfc3339(),
        environment: state.config.environment.as_str(),
        memory: state.metrics.process_memory(),
    })
}

// ─── GET /error ──────────────────────────────────────────────────
/// Always faults. Lets tests and operators exercise the 500 path.

pub async fn fail() -> Result<Json<Welcome>, AppError> {
    Err(AppError::Internal("test route failure".into()))
}

// ─── Fallback ────────────────────────────────────────────────────

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound {
        path: uri.path().to_owned(),
    }
}
