use axum::{body::Body as AxumBody, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

pub async fn request_logger(req: Request<AxumBody>, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start_time = Instant::now();

    info!(%request_id, %method, %path, "Request received");
    let response = next.run(req).await;
    info!(
        %request_id,
        %method,
        %path,
        status = response.status().as_u16(),
        duration_ms = start_time.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}
