use axum::{Router, http::Method, middleware as axum_middleware};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::services::MonitorService;

pub use error::AppError;

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub monitor: Arc<MonitorService>,
}

pub fn create_axum_router(config: Arc<AppConfig>, monitor: Arc<MonitorService>) -> Router {
    let app_state = Arc::new(AppState { config, monitor });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .merge(routes::health_routes::create_health_router())
        .merge(routes::metrics_routes::create_metrics_router())
        .merge(routes::replication_routes::create_replication_router())
        .with_state(app_state)
        .layer(axum_middleware::from_fn(middleware::request_logger::request_logger))
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::EndpointProber;
    use crate::probe::replication::tests::ManualClock;
    use crate::store::testing::FakeStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    struct SeoulOnlyProber;

    #[async_trait]
    impl EndpointProber for SeoulOnlyProber {
        async fn probe(&self, url: &str) -> Option<Duration> {
            url.contains("seoul").then_some(Duration::from_millis(20))
        }
    }

    fn app_with(writer: FakeStore, reader: FakeStore, config: AppConfig) -> Router {
        let config = Arc::new(config);
        let monitor = Arc::new(MonitorService::new(
            &config,
            Arc::new(writer),
            Arc::new(reader),
            Arc::new(SeoulOnlyProber),
            Arc::new(ManualClock::new()),
        ));
        create_axum_router(config, monitor)
    }

    fn app(writer: FakeStore, reader: FakeStore) -> Router {
        app_with(writer, reader, AppConfig::for_tests())
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_region() {
        let (status, body) =
            send(app(FakeStore::healthy(), FakeStore::healthy()), get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["region"], "us-east-1");
        let timestamp = body["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[tokio::test]
    async fn test_db_health_ok_when_both_connected() {
        let (status, body) =
            send(app(FakeStore::healthy(), FakeStore::healthy()), get("/db-health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["writer"]["endpoint"], "writer.db.internal");
        assert_eq!(body["writer"]["status"], "connected");
        assert_eq!(body["reader"]["endpoint"], "reader.db.internal");
        assert!(body["reader"]["latency_ms"].is_number());
    }

    #[tokio::test]
    async fn test_db_health_unavailable_when_primary_fails() {
        let writer = FakeStore {
            fail_ping: true,
            ..FakeStore::healthy()
        };
        let (status, body) = send(app(writer, FakeStore::healthy()), get("/db-health")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["writer"]["status"], "error");
        assert!(body["writer"]["latency_ms"].is_null());
        assert!(body["writer"]["error"].is_string());
        assert_eq!(body["reader"]["status"], "connected");
    }

    #[tokio::test]
    async fn test_latency_lists_peers_in_order() {
        let (status, body) =
            send(app(FakeStore::healthy(), FakeStore::healthy()), get("/metrics/latency")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current_region"], "us-east-1");
        let endpoints = body["endpoints"].as_array().unwrap();
        assert_eq!(endpoints.len(), 3);
        assert_eq!(endpoints[0]["region"], "ap-northeast-2");
        assert_eq!(endpoints[0]["latency_ms"], 20);
        assert_eq!(endpoints[1]["region"], "us-east-1");
        assert!(endpoints[1]["latency_ms"].is_null());
        assert_eq!(endpoints[2]["online"], false);
    }

    #[tokio::test]
    async fn test_metrics_reports_replica_figures() {
        let reader = FakeStore {
            replay_lag: Some(120),
            connections: 9,
            ..FakeStore::healthy()
        };
        let (status, body) = send(app(FakeStore::healthy(), reader), get("/metrics")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["region"], "us-east-1");
        assert_eq!(body["database"]["replication_lag_ms"], 120);
        assert_eq!(body["database"]["lag_severity"], "excellent");
        assert_eq!(body["database"]["connections"], 9);
    }

    #[tokio::test]
    async fn test_write_created_with_replication_report() {
        let (status, body) = send(
            app(FakeStore::healthy(), FakeStore::healthy()),
            post("/test-write", r#"{"test_data":"ping"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 1);
        assert_eq!(body["test_data"], "ping");
        assert_eq!(body["message"], "Write successful to primary database");
        assert_eq!(body["replication"]["found_in_replica"], true);
        assert_eq!(body["replication"]["lag_ms"], 0);
        assert_eq!(body["replication"]["max_wait_ms"], 1000);
    }

    #[tokio::test]
    async fn test_write_defaults_payload_for_empty_body() {
        let reader = FakeStore {
            visible_on_poll: None,
            ..FakeStore::healthy()
        };
        let (status, body) = send(app(FakeStore::healthy(), reader), post("/test-write", "")).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["test_data"], "sample");
        assert_eq!(body["replication"]["found_in_replica"], false);
        assert!(body["replication"]["lag_ms"].is_null());
        assert_eq!(body["replication"]["attempts"], 10);
        assert_eq!(body["replication"]["lag_severity"], "unknown");
    }

    #[tokio::test]
    async fn test_write_defaults_payload_for_empty_test_data() {
        let (status, body) = send(
            app(FakeStore::healthy(), FakeStore::healthy()),
            post("/test-write", r#"{"test_data":""}"#),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["test_data"], "sample");
    }

    #[tokio::test]
    async fn test_write_failure_maps_to_server_error() {
        let writer = FakeStore {
            fail_insert: true,
            ..FakeStore::healthy()
        };
        let (status, body) =
            send(app(writer, FakeStore::healthy()), post("/test-write", "{}")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .starts_with("Failed to write replication marker")
        );
        // for_tests() runs in development mode.
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_write_failure_hides_detail_outside_development() {
        let writer = FakeStore {
            fail_insert: true,
            ..FakeStore::healthy()
        };
        let mut config = AppConfig::for_tests();
        config.node_env = "production".to_string();
        let (status, body) =
            send(app_with(writer, FakeStore::healthy(), config), post("/test-write", "{}")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.get("detail").is_none());
    }

    #[tokio::test]
    async fn test_write_rejects_malformed_json() {
        let (status, body) = send(
            app(FakeStore::healthy(), FakeStore::healthy()),
            post("/test-write", "{not json"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }
}
