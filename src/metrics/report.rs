use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::StatsSnapshot;

/// How many endpoints the dashboard's bar chart shows.
pub const TOP_ENDPOINTS: usize = 6;

/// Derived statistics served by `GET /api/stats`.
/// Serialized straight into the JSON the dashboard polls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub total_requests: u64,
    pub requests_per_min: f64,
    /// Mean of the recent response-time window (ms)
    pub avg_response_time: f64,
    /// Process uptime (s)
    pub uptime: f64,
    pub endpoint_stats: Vec<EndpointStat>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointStat {
    pub name: String,
    pub count: u64,
}

impl StatsReport {
    /// Compute every derived figure from a snapshot. Nothing here is stored.
    pub fn from_snapshot(snap: &StatsSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            total_requests: snap.total_requests,
            requests_per_min: requests_per_minute(snap.total_requests, snap.uptime_secs),
            avg_response_time: mean(&snap.response_times_ms),
            uptime: snap.uptime_secs,
            endpoint_stats: top_endpoints(&snap.endpoints, TOP_ENDPOINTS),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn requests_per_minute(total: u64, uptime_secs: f64) -> f64 {
    let minutes = uptime_secs / 60.0;
    if minutes > 0.0 {
        total as f64 / minutes
    } else {
        0.0
    }
}

/// Highest counts first; `sort_by` is stable so ties keep first-seen order.
fn top_endpoints(endpoints: &[(String, u64)], limit: usize) -> Vec<EndpointStat> {
    let mut ranked: Vec<&(String, u64)> = endpoints.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(limit)
        .map(|(key, count)| EndpointStat {
            name: strip_method(key).to_owned(),
            count: *count,
        })
        .collect()
}

/// "GET /api/data" → "/api/data"
fn strip_method(key: &str) -> &str {
    key.split_once(' ').map(|(_, route)| route).unwrap_or(key)
}
