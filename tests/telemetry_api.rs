use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    routing,
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use telemetry_dashboard::config::{Config, Environment};
use telemetry_dashboard::{server, AppState};

// ─── Helpers ─────────────────────────────────────────────────────

fn app_with(config: Config) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config).unwrap());
    (server::create_router(state.clone()), state)
}

fn app() -> (Router, Arc<AppState>) {
    app_with(Config::for_tests())
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> Response {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_owned())
        }
        None => Body::empty(),
    };
    app.clone().oneshot(req.body(body).unwrap()).await.unwrap()
}

async fn get(app: &Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

async fn text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn json(response: Response) -> Value {
    serde_json::from_str(&text(response).await).unwrap()
}

async fn boom() -> &'static str {
    panic!("kaboom")
}

// ─── /api/stats ──────────────────────────────────────────────────

#[tokio::test]
async fn stats_reflect_traffic_by_endpoint() {
    let (app, _) = app();

    for _ in 0..3 {
        assert_eq!(get(&app, "/api/data").await.status(), StatusCode::OK);
    }
    for _ in 0..2 {
        let res = send(&app, Method::POST, "/api/echo", Some(r#"{"hello":"world"}"#)).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let stats = json(get(&app, "/api/stats").await).await;
    assert_eq!(stats["totalRequests"], 5);

    let endpoints = stats["endpointStats"].as_array().unwrap();
    assert_eq!(endpoints.len(), 2);
    assert_eq!(endpoints[0]["name"], "/api/data");
    assert_eq!(endpoints[0]["count"], 3);
    assert_eq!(endpoints[1]["name"], "/api/echo");
    assert_eq!(endpoints[1]["count"], 2);

    assert!(stats["avgResponseTime"].as_f64().unwrap() >= 0.0);
    assert!(stats["requestsPerMin"].as_f64().is_some());
    assert!(stats["uptime"].as_f64().is_some());
    assert!(stats["timestamp"].is_string());
}

#[tokio::test]
async fn stats_on_fresh_service() {
    let (app, _) = app();

    let stats = json(get(&app, "/api/stats").await).await;
    assert_eq!(stats["totalRequests"], 0);
    assert_eq!(stats["avgResponseTime"], 0.0);
    assert_eq!(stats["endpointStats"], Value::Array(vec![]));
}

#[tokio::test]
async fn stats_request_counts_toward_the_next_read() {
    let (app, _) = app();

    let first = json(get(&app, "/api/stats").await).await;
    let second = json(get(&app, "/api/stats").await).await;
    assert_eq!(first["totalRequests"], 0);
    assert_eq!(second["totalRequests"], 1);
    assert_eq!(second["endpointStats"][0]["name"], "/api/stats");
}

#[tokio::test]
async fn response_window_is_bounded() {
    let (app, state) = app();

    for _ in 0..130 {
        get(&app, "/welcome").await;
    }

    let snap = state.stats.snapshot();
    assert_eq!(snap.total_requests, 130);
    assert_eq!(snap.response_times_ms.len(), 100);
}

// ─── /metrics ────────────────────────────────────────────────────

#[tokio::test]
async fn metrics_exposition_after_traffic() {
    let (app, _) = app();
    get(&app, "/api/data").await;

    let res = get(&app, "/metrics").await;
    assert_eq!(res.status(), StatusCode::OK);
    let content_type = res.headers()[header::CONTENT_TYPE].to_str().unwrap().to_owned();
    assert!(content_type.starts_with("text/plain"));

    let body = text(res).await;
    assert!(body.contains("http_requests_total"));
    assert!(body.contains("http_request_duration_seconds"));
    assert!(body.contains(r#"http_requests_total{method="GET",route="/api/data",status="200"} 1"#));
}

#[tokio::test]
async fn unmatched_paths_share_one_label() {
    let (app, state) = app();

    for path in ["/no/such/thing", "/another-miss", "/x/y/z"] {
        let res = get(&app, path).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    let body = state.metrics.render().unwrap();
    assert!(body.contains(r#"route="unmatched",status="404"} 3"#));
    assert!(!body.contains("/no/such/thing"));
}

// ─── Faults ──────────────────────────────────────────────────────

#[tokio::test]
async fn failing_route_is_recorded_as_500() {
    let (app, state) = app();

    let res = get(&app, "/error").await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json(res).await;
    assert_eq!(body["error"], "Internal server error");
    assert_eq!(body["code"], "INTERNAL_ERROR");
    assert!(body["timestamp"].is_string());
    // test environment shows the detail
    assert_eq!(body["message"], "test route failure");

    assert_eq!(state.stats.snapshot().total_requests, 1);
    let metrics = state.metrics.render().unwrap();
    assert!(metrics.contains(r#"http_requests_total{method="GET",route="/error",status="500"} 1"#));
}

#[tokio::test]
async fn panicking_handler_is_recorded_as_500() {
    let state = Arc::new(AppState::new(Config::for_tests()).unwrap());
    let app = server::with_telemetry(Router::new().route("/boom", routing::get(boom)), state.clone());

    let res = get(&app, "/boom").await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json(res).await;
    assert_eq!(body["code"], "INTERNAL_ERROR");
    assert_eq!(body["message"], "kaboom");

    let snap = state.stats.snapshot();
    assert_eq!(snap.total_requests, 1);
    assert_eq!(snap.endpoints, vec![("GET /boom".to_string(), 1)]);
    let metrics = state.metrics.render().unwrap();
    assert!(metrics.contains(r#"route="/boom",status="500""#));
}

#[tokio::test]
async fn production_hides_error_detail() {
    let config = Config {
        environment: Environment::Production,
        ..Config::for_tests()
    };
    let (app, _) = app_with(config);

    let body = json(get(&app, "/error").await).await;
    assert_eq!(body["error"], "Internal server error");
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn malformed_echo_body_is_bad_request() {
    let (app, state) = app();

    let res = send(&app, Method::POST, "/api/echo", Some("{not json")).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(res).await["code"], "BAD_REQUEST");

    let metrics = state.metrics.render().unwrap();
    assert!(metrics.contains(r#"method="POST",route="/api/echo",status="400""#));
}

#[tokio::test]
async fn echo_without_json_body_gets_empty_object() {
    let (app, _) = app();

    let res = send(&app, Method::POST, "/api/echo", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json(res).await;
    assert_eq!(body["received"], serde_json::json!({}));
}

// ─── Other routes ────────────────────────────────────────────────

#[tokio::test]
async fn timing_headers_on_every_response() {
    let (app, _) = app();

    for path in ["/api/data", "/missing"] {
        let res = get(&app, path).await;
        assert!(res.headers().contains_key("x-response-time-us"));
        let timing = res.headers()["server-timing"].to_str().unwrap();
        assert!(timing.starts_with("total;dur="));
    }
}

#[tokio::test]
async fn data_reports_request_count() {
    let (app, _) = app();
    get(&app, "/welcome").await;

    let body = json(get(&app, "/api/data").await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
    assert_eq!(body["requestCount"], 1);
}

#[tokio::test]
async fn echo_returns_body_and_headers() {
    let (app, _) = app();

    let body = json(send(&app, Method::POST, "/api/echo", Some(r#"{"n":7}"#)).await).await;
    assert_eq!(body["received"]["n"], 7);
    assert_eq!(body["headers"]["content-type"], "application/json");
}

#[tokio::test]
async fn health_and_root_in_test_env() {
    let (app, _) = app();

    let health = json(get(&app, "/health").await).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["environment"], "test");
    let memory = &health["memory"];
    if cfg!(target_os = "linux") {
        assert!(memory["residentBytes"].as_u64().unwrap() > 0);
        assert!(memory["virtualBytes"].as_u64().unwrap() > 0);
    } else {
        assert!(memory.is_null());
    }

    let root = json(get(&app, "/").await).await;
    assert_eq!(root["message"], "Welcome to the dashboard");
}

#[tokio::test]
async fn simulate_load_stays_under_bound() {
    let (app, _) = app();

    let body = json(get(&app, "/api/simulate-load").await).await;
    assert_eq!(body["message"], "Simulated load");
    let delay: f64 = body["delay"]
        .as_str()
        .unwrap()
        .trim_end_matches("ms")
        .parse()
        .unwrap();
    assert!((0.0..100.0).contains(&delay));
}
