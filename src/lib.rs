//! Dashboard service with request telemetry.
//!
//! Every request passes through [`middleware::telemetry::instrument`], which
//! feeds a Prometheus [`metrics::MetricsRegistry`] (served at `/metrics`) and
//! the rolling [`metrics::StatsAggregator`] (summarised at `/api/stats`).

use std::time::Instant;

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;

use config::Config;
use metrics::{MetricsRegistry, StatsAggregator, TelemetryError};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    pub config: Config,

    /// Prometheus counters and histograms. Middleware writes, `/metrics` reads.
    pub metrics: MetricsRegistry,

    /// Rolling in-memory stats. Middleware writes, `/api/stats` reads.
    pub stats: StatsAggregator,
}

impl AppState {
    /// Fresh state whose uptime starts now. Handy for tests.
    pub fn new(config: Config) -> Result<Self, TelemetryError> {
        Self::started_at(config, Instant::now())
    }

    /// `process_start` is the instant `main` began, so reported uptime
    /// covers the whole process.
    pub fn started_at(config: Config, process_start: Instant) -> Result<Self, TelemetryError> {
        Ok(Self {
            config,
            metrics: MetricsRegistry::new()?,
            stats: StatsAggregator::new(process_start),
        })
    }
}
