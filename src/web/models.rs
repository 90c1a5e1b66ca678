use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::probe::{ConnectionStatus, ConnectivityResult};
use crate::snapshot::HealthStatus;

#[derive(Serialize, Debug)]
pub struct BasicHealthResponse {
    pub status: &'static str,
    pub region: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Debug)]
pub struct RoleHealth {
    pub endpoint: String,
    pub status: ConnectionStatus,
    pub latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RoleHealth {
    pub fn new(endpoint: &str, result: &ConnectivityResult) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            status: result.status,
            latency_ms: result.latency_ms(),
            error: result.error().map(str::to_string),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct DbHealthResponse {
    pub writer: RoleHealth,
    pub reader: RoleHealth,
    pub status: HealthStatus,
}

#[derive(Deserialize, Debug, Default)]
pub struct TestWriteRequest {
    pub test_data: Option<String>,
}
