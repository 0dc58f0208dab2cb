use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::metrics::{Observation, UNMATCHED_ROUTE};
use crate::AppState;

/// Instruments every request/response cycle.
///
/// Measures wall time from interception until the inner service has
/// produced its response, then records one [`Observation`] into the
/// Prometheus registry and the rolling stats, in that order, and stamps
/// the measured time onto the response (see [`stamp_timing`]).
///
/// Panics are turned into 500 responses further in, so they are observed
/// here like any other response.
pub async fn instrument(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().as_str().to_owned();
    let path = req.uri().path().to_owned();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned());

    let in_flight = InFlight::start(&state, method, route);
    let mut response = next.run(req).await;
    let elapsed = in_flight.complete(response.status());
    stamp_timing(response.headers_mut(), elapsed);

    // Dashboard assets and the long-lived stats stream would drown the API lines
    if path.starts_with("/api/") && !path.ends_with("/stream") {
        tracing::debug!(
            status = response.status().as_u16(),
            %path,
            elapsed_us = elapsed.as_micros() as u64,
            "api request served"
        );
    }

    response
}

/// `X-Response-Time-Us` carries the recorded duration in microseconds and
/// `Server-Timing` repeats it in milliseconds for browser dev tools.
fn stamp_timing(headers: &mut HeaderMap, elapsed: Duration) {
    headers.insert(
        HeaderName::from_static("x-response-time-us"),
        HeaderValue::from(elapsed.as_micros() as u64),
    );
    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(value) = HeaderValue::from_str(&server_timing) {
        headers.insert(HeaderName::from_static("server-timing"), value);
    }
}

/// Finalizer armed once per request.
///
/// `complete` records exactly one observation. If the request future is
/// dropped first (client went away) nothing is recorded.
struct InFlight<'a> {
    state: &'a AppState,
    method: String,
    route: String,
    start: Instant,
    done: bool,
}

impl<'a> InFlight<'a> {
    fn start(state: &'a AppState, method: String, route: String) -> Self {
        Self {
            state,
            method,
            route,
            start: Instant::now(),
            done: false,
        }
    }

    fn complete(mut self, status: StatusCode) -> Duration {
        let duration = self.start.elapsed();
        self.done = true;

        let obs = Observation {
            method: std::mem::take(&mut self.method),
            route: std::mem::take(&mut self.route),
            status: status.as_u16(),
            duration,
        };
        record(self.state, &obs);
        duration
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            tracing::debug!(
                method = %self.method,
                route = %self.route,
                "request cancelled before completion, not recorded"
            );
        }
    }
}

/// Feed both sinks. Failures are logged and swallowed; observability
/// never affects the response.
fn record(state: &AppState, obs: &Observation) {
    if let Err(e) = state.metrics.record(obs) {
        tracing::warn!(
            error = %e,
            method = %obs.method,
            route = %obs.route,
            status = obs.status,
            "failed to record request metrics"
        );
    }
    state.stats.record(obs);
}
