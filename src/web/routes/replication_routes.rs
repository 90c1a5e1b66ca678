use axum::{Json, Router, body::Bytes, extract::State, http::StatusCode, routing::post};
use std::sync::Arc;
use tracing::error;

use crate::snapshot::ReplicationReport;
use crate::web::models::TestWriteRequest;
use crate::web::{AppError, AppState};

pub fn create_replication_router() -> Router<Arc<AppState>> {
    Router::new().route("/test-write", post(test_write))
}

/// Writes a marker on the primary and reports how long the replica took to
/// show it. An empty body is accepted and uses the default payload.
async fn test_write(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<ReplicationReport>), AppError> {
    let request: TestWriteRequest = if body.iter().all(u8::is_ascii_whitespace) {
        TestWriteRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };
    let test_data = request
        .test_data
        .filter(|data| !data.is_empty())
        .unwrap_or_else(|| "sample".to_string());

    let report = app_state
        .monitor
        .run_replication_probe(&test_data)
        .await
        .map_err(|e| {
            error!(error = %e, "Error in test-write");
            AppError::from_probe(e, app_state.config.is_development())
        })?;

    Ok((StatusCode::CREATED, Json(report)))
}
