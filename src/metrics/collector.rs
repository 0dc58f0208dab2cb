use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use parking_lot::Mutex;

use super::Observation;

// ─── Configuration ───────────────────────────────────────────────

/// How many recent response times we keep for the average
pub const RESPONSE_TIME_WINDOW: usize = 100;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe rolling request statistics.
/// The middleware calls `record()`, the stats endpoints call `snapshot()`.
///
/// All three fields live behind one lock so a reader sees a request
/// either fully applied or not at all.
pub struct StatsAggregator {
    inner: Mutex<Inner>,
    process_start: Instant,
}

/// Point-in-time copy of the aggregate state.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    /// `("<METHOD> <route>", count)` in first-seen order
    pub endpoints: Vec<(String, u64)>,
    /// Most recent response times in milliseconds, oldest first
    pub response_times_ms: Vec<f64>,
    /// Seconds since process start
    pub uptime_secs: f64,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    total_requests: u64,

    // Insertion-ordered endpoint counters; the index maps key → slot
    endpoints: Vec<(String, u64)>,
    endpoint_index: HashMap<String, usize>,

    // Ring buffer of recent durations
    response_times_ms: VecDeque<f64>,
    window: usize,
}

// ─── StatsAggregator impl ────────────────────────────────────────

impl StatsAggregator {
    /// `process_start` should be captured as early as possible in `main`
    /// so uptime reflects the process, not the aggregator.
    pub fn new(process_start: Instant) -> Self {
        Self::with_window(process_start, RESPONSE_TIME_WINDOW)
    }

    pub fn with_window(process_start: Instant, window: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::new(window.max(1))),
            process_start,
        }
    }

    /// Record one completed request.
    pub fn record(&self, obs: &Observation) {
        let key = obs.endpoint_key();
        let ms = obs.duration_ms();
        self.inner.lock().record(key, ms);
    }

    pub fn total_requests(&self) -> u64 {
        self.inner.lock().total_requests
    }

    pub fn uptime_secs(&self) -> f64 {
        self.process_start.elapsed().as_secs_f64()
    }

    /// Produce a consistent read-only copy of the current state.
    pub fn snapshot(&self) -> StatsSnapshot {
        let inner = self.inner.lock();
        StatsSnapshot {
            total_requests: inner.total_requests,
            endpoints: inner.endpoints.clone(),
            response_times_ms: inner.response_times_ms.iter().copied().collect(),
            uptime_secs: self.uptime_secs(),
        }
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn new(window: usize) -> Self {
        Self {
            total_requests: 0,
            endpoints: Vec::new(),
            endpoint_index: HashMap::new(),
            response_times_ms: VecDeque::with_capacity(window),
            window,
        }
    }

    fn record(&mut self, key: String, ms: f64) {
        self.total_requests += 1;

        match self.endpoint_index.get(&key) {
            Some(&slot) => self.endpoints[slot].1 += 1,
            None => {
                self.endpoint_index.insert(key.clone(), self.endpoints.len());
                self.endpoints.push((key, 1));
            }
        }

        if self.response_times_ms.len() == self.window {
            self.response_times_ms.pop_front();
        }
        self.response_times_ms.push_back(ms);
    }
}
