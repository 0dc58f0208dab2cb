use axum::{extract::State, Json};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::AppState;

use super::now_rfc3339;

// ─── Domain types ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub id: u32,
    pub name: &'static str,
    pub status: &'static str,
    pub latency: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse {
    pub data: Vec<ServiceStatus>,
    pub timestamp: String,
    pub request_count: u64,
}

#[derive(Debug, Serialize)]
pub struct SimulatedLoad {
    pub message: &'static str,
    pub delay: String,
    pub timestamp: String,
}

/// Upper bound of the artificial delay (ms)
const MAX_SIMULATED_DELAY_MS: f64 = 100.0;

static SERVICES: &[(&str, &str)] = &[
    ("Service A", "45ms"),
    ("Service B", "32ms"),
    ("Service C", "58ms"),
    ("Database", "12ms"),
    ("Redis Cache", "5ms"),
];

// ─── GET /api/data ───────────────────────────────────────────────

pub async fn get_data(State(state): State<Arc<AppState>>) -> Json<DataResponse> {
    let data = SERVICES
        .iter()
        .zip(1..)
        .map(|(&(name, latency), id)| ServiceStatus {
            id,
            name,
            status: "active",
            latency,
        })
        .collect();

    Json(DataResponse {
        data,
        timestamp: now_rfc3339(),
        request_count: state.stats.total_requests(),
    })
}

// ─── GET /api/simulate-load ──────────────────────────────────────

pub async fn simulate_load() -> Json<SimulatedLoad> {
    let delay_ms = rand::thread_rng().gen_range(0.0..MAX_SIMULATED_DELAY_MS);
    tokio::time::sleep(Duration::from_secs_f64(delay_ms / 1000.0)).await;

    Json(SimulatedLoad {
        message: "Simulated load",
        delay: format!("{delay_ms:.2}ms"),
        timestamp: now_rfc3339(),
    })
}
