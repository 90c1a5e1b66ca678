use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use thiserror::Error;

use crate::probe::ProbeError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{message}")]
    ServerError {
        message: String,
        detail: Option<String>,
    },
}

impl AppError {
    /// Server error from a failed replication probe. `include_detail` adds
    /// the debug form of the error to the body, for development builds.
    pub fn from_probe(err: ProbeError, include_detail: bool) -> Self {
        let detail = include_detail.then(|| format!("{err:?}"));
        AppError::ServerError {
            message: err.to_string(),
            detail,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::ServerError { message, detail } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message, detail)
            }
        };

        let mut body = serde_json::json!({
            "status": "error",
            "message": message,
            "timestamp": Utc::now().to_rfc3339(),
        });
        if let Some(detail) = detail {
            body["detail"] = serde_json::Value::String(detail);
        }
        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("Malformed JSON body: {err}"))
    }
}
