use axum::{Json, Router, extract::State, routing::get};
use std::sync::Arc;

use crate::snapshot::{LatencySnapshot, MetricsSnapshot};
use crate::web::AppState;

pub fn create_metrics_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/metrics/latency", get(latency))
}

async fn metrics(State(app_state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(app_state.monitor.metrics_snapshot().await)
}

async fn latency(State(app_state): State<Arc<AppState>>) -> Json<LatencySnapshot> {
    Json(app_state.monitor.latency_snapshot().await)
}
