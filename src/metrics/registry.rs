use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use serde::Serialize;

use super::{Observation, TelemetryError};

// ─── Configuration ───────────────────────────────────────────────

const REQUESTS_TOTAL: &str = "http_requests_total";
const REQUEST_DURATION: &str = "http_request_duration_seconds";

const RESIDENT_MEMORY: &str = "process_resident_memory_bytes";
const VIRTUAL_MEMORY: &str = "process_virtual_memory_bytes";

/// Every series is keyed by this label tuple.
const LABELS: &[&str] = &["method", "route", "status"];

/// Histogram bucket upper bounds (seconds), ascending.
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

// ─── Public types ────────────────────────────────────────────────

/// Process memory as reported by the process collector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub resident_bytes: u64,
    pub virtual_bytes: u64,
}

/// Prometheus instruments fed by the instrumentation middleware.
/// The middleware calls `record()`, `GET /metrics` calls `render()`.
pub struct MetricsRegistry {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
}

impl MetricsRegistry {
    /// Builds a fresh registry with the two request instruments and,
    /// where the platform supports it, the process collector.
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new(REQUESTS_TOTAL, "Total number of HTTP requests"),
            LABELS,
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(REQUEST_DURATION, "Duration of HTTP requests in seconds")
                .buckets(DURATION_BUCKETS.to_vec()),
            LABELS,
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
        })
    }

    /// Count the request and observe its duration under the same label tuple.
    pub fn record(&self, obs: &Observation) -> Result<(), TelemetryError> {
        if !(100..=599).contains(&obs.status) {
            return Err(TelemetryError::InvalidStatus(obs.status));
        }

        let status = obs.status.to_string();
        let labels = [obs.method.as_str(), obs.route.as_str(), status.as_str()];

        self.requests_total.get_metric_with_label_values(&labels)?.inc();
        self.request_duration
            .get_metric_with_label_values(&labels)?
            .observe(obs.duration_secs());
        Ok(())
    }

    /// Full text exposition of every registered instrument.
    pub fn render(&self) -> Result<String, TelemetryError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    /// Current resident and virtual memory of this process.
    /// `None` where no process collector is registered (non-Linux).
    pub fn process_memory(&self) -> Option<MemoryUsage> {
        let mut resident = None;
        let mut virt = None;
        for family in self.registry.gather() {
            let slot = match family.get_name() {
                RESIDENT_MEMORY => &mut resident,
                VIRTUAL_MEMORY => &mut virt,
                _ => continue,
            };
            *slot = family
                .get_metric()
                .first()
                .map(|m| m.get_gauge().get_value() as u64);
        }

        Some(MemoryUsage {
            resident_bytes: resident?,
            virtual_bytes: virt?,
        })
    }

    /// Value of the `Content-Type` header for [`render`](Self::render) output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_owned()
    }
}
