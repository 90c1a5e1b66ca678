use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use std::sync::Arc;

use crate::snapshot::HealthStatus;
use crate::web::AppState;
use crate::web::models::{BasicHealthResponse, DbHealthResponse, RoleHealth};

pub fn create_health_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/db-health", get(db_health))
}

async fn health(State(app_state): State<Arc<AppState>>) -> Json<BasicHealthResponse> {
    Json(BasicHealthResponse {
        status: "healthy",
        region: app_state.config.region.clone(),
        timestamp: Utc::now(),
    })
}

/// 200 when both roles answer, 503 otherwise.
async fn db_health(
    State(app_state): State<Arc<AppState>>,
) -> (StatusCode, Json<DbHealthResponse>) {
    let snapshot = app_state.monitor.health_snapshot().await;
    let status_code = match snapshot.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };

    let config = &app_state.config;
    let response = DbHealthResponse {
        writer: RoleHealth::new(&config.db_writer_host, &snapshot.writer),
        reader: RoleHealth::new(&config.db_reader_host, &snapshot.reader),
        status: snapshot.status,
    };
    (status_code, Json(response))
}
