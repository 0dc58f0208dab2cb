pub mod collector;
pub mod registry;
pub mod report;
pub mod stream;

use std::time::Duration;

pub use collector::{StatsAggregator, StatsSnapshot};
pub use registry::{MemoryUsage, MetricsRegistry};
pub use report::{EndpointStat, StatsReport};

/// Label used for requests that did not match any registered route.
/// Keeps metric cardinality bounded no matter what paths clients send.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// A single completed request, as seen by the instrumentation middleware.
/// This is the "write" side: the middleware builds one per request and
/// pushes it into both sinks.
#[derive(Debug, Clone)]
pub struct Observation {
    /// e.g. "GET"
    pub method: String,
    /// Route template such as "/api/data", or [`UNMATCHED_ROUTE`]
    pub route: String,
    /// Final response status code
    pub status: u16,
    /// Wall time from interception to response
    pub duration: Duration,
}

impl Observation {
    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration.as_nanos() as f64 / 1_000_000.0
    }

    /// Key used by the rolling stats, e.g. "GET /api/data".
    pub fn endpoint_key(&self) -> String {
        format!("{} {}", self.method, self.route)
    }
}

/// Failures inside the telemetry sinks. Never surfaced to clients.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("status code {0} is outside 100..=599")]
    InvalidStatus(u16),

    #[error("prometheus: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("exposition output is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}
