use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use super::StatsReport;
use crate::handlers::AppError;
use crate::AppState;

const STREAM_PERIOD: Duration = Duration::from_secs(2);
const KEEP_ALIVE_PERIOD: Duration = Duration::from_secs(15);

// ─── GET /metrics ────────────────────────────────────────────────
/// Prometheus text exposition for scrapers.

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| AppError::Internal(format!("rendering metrics: {e}")))?;

    Ok(([(header::CONTENT_TYPE, state.metrics.content_type())], body).into_response())
}

// ─── GET /api/stats ──────────────────────────────────────────────
/// Returns a single derived-statistics report, which is what the dashboard polls.

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsReport> {
    Json(current_report(&state))
}

// ─── GET /api/stats/stream ───────────────────────────────────────
/// Live variant of `/api/stats` for dashboards that prefer push over polling.
/// Emits a `stats` event carrying the report JSON every 2 s; each tick takes
/// its own snapshot, so the stream never holds the aggregator lock.

pub async fn stats_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let ticks = IntervalStream::new(tokio::time::interval(STREAM_PERIOD));

    let stream = ticks.map(move |_| {
        let json = serde_json::to_string(&current_report(&state)).unwrap_or_default();
        Ok(Event::default().event("stats").data(json))
    });

    // Proxies may cut an idle connection; comment frames keep it open
    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_PERIOD))
}

fn current_report(state: &AppState) -> StatsReport {
    StatsReport::from_snapshot(&state.stats.snapshot(), chrono::Utc::now())
}
