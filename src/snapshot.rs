//! Pure aggregation of probe results into response snapshots, plus the
//! threshold tables used to classify them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::probe::{ConnectivityResult, LatencySample, ReplicationProbe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Healthy only when both sides of the pair are connected.
pub fn classify_health(writer: &ConnectivityResult, reader: &ConnectivityResult) -> HealthStatus {
    if writer.is_connected() && reader.is_connected() {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LagSeverity {
    Excellent,
    Acceptable,
    High,
    Unknown,
}

pub const LAG_ACCEPTABLE_MS: i64 = 500;
pub const LAG_HIGH_MS: i64 = 1000;

pub fn classify_lag(lag_ms: Option<i64>) -> LagSeverity {
    match lag_ms {
        None => LagSeverity::Unknown,
        Some(ms) if ms < LAG_ACCEPTABLE_MS => LagSeverity::Excellent,
        Some(ms) if ms < LAG_HIGH_MS => LagSeverity::Acceptable,
        Some(_) => LagSeverity::High,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyTier {
    Fast,
    Moderate,
    Slow,
    Offline,
}

pub fn classify_latency(latency_ms: Option<u64>) -> LatencyTier {
    match latency_ms {
        None => LatencyTier::Offline,
        Some(ms) if ms < 100 => LatencyTier::Fast,
        Some(ms) if ms < 200 => LatencyTier::Moderate,
        Some(_) => LatencyTier::Slow,
    }
}

#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub writer: ConnectivityResult,
    pub reader: ConnectivityResult,
    pub status: HealthStatus,
}

impl HealthSnapshot {
    pub fn new(writer: ConnectivityResult, reader: ConnectivityResult) -> Self {
        let status = classify_health(&writer, &reader);
        Self {
            writer,
            reader,
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointLatency {
    pub region: String,
    pub url: String,
    pub latency_ms: Option<u64>,
    pub online: bool,
    pub tier: LatencyTier,
}

impl From<LatencySample> for EndpointLatency {
    fn from(sample: LatencySample) -> Self {
        let latency_ms = sample.latency_ms();
        Self {
            online: sample.is_online(),
            tier: classify_latency(latency_ms),
            latency_ms,
            region: sample.endpoint.name,
            url: sample.endpoint.url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencySnapshot {
    pub current_region: String,
    pub endpoints: Vec<EndpointLatency>,
    pub timestamp: DateTime<Utc>,
}

impl LatencySnapshot {
    /// Samples pass through in order; nothing is dropped or reordered.
    pub fn new(current_region: impl Into<String>, samples: Vec<LatencySample>) -> Self {
        Self {
            current_region: current_region.into(),
            endpoints: samples.into_iter().map(EndpointLatency::from).collect(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplicationOutcome {
    pub found_in_replica: bool,
    pub lag_ms: Option<i64>,
    pub max_wait_ms: u64,
    pub attempts: u32,
    pub max_attempts: u32,
    pub lag_severity: LagSeverity,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplicationReport {
    pub id: i64,
    pub timestamp: String,
    pub message: String,
    pub replication: ReplicationOutcome,
    pub test_data: String,
}

impl ReplicationReport {
    pub fn new(probe: &ReplicationProbe, test_data: impl Into<String>) -> Self {
        let lag_ms = probe.lag_ms();
        Self {
            id: probe.marker_id,
            timestamp: probe.written_at_iso(),
            message: "Write successful to primary database".to_string(),
            replication: ReplicationOutcome {
                found_in_replica: probe.found,
                lag_ms,
                max_wait_ms: probe.max_wait_ms(),
                attempts: probe.attempts,
                max_attempts: probe.max_attempts,
                lag_severity: classify_lag(lag_ms),
            },
            test_data: test_data.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseMetrics {
    pub replication_lag_ms: Option<i64>,
    pub lag_severity: LagSeverity,
    pub connections: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub region: String,
    pub database: DatabaseMetrics,
    pub timestamp: DateTime<Utc>,
}

impl MetricsSnapshot {
    pub fn new(
        region: impl Into<String>,
        replication_lag_ms: Option<i64>,
        connections: i64,
    ) -> Self {
        Self {
            region: region.into(),
            database: DatabaseMetrics {
                replication_lag_ms,
                lag_severity: classify_lag(replication_lag_ms),
                connections,
            },
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{Endpoint, Role};
    use std::time::Duration;

    #[test]
    fn test_lag_thresholds() {
        assert_eq!(classify_lag(None), LagSeverity::Unknown);
        assert_eq!(classify_lag(Some(0)), LagSeverity::Excellent);
        assert_eq!(classify_lag(Some(499)), LagSeverity::Excellent);
        assert_eq!(classify_lag(Some(500)), LagSeverity::Acceptable);
        assert_eq!(classify_lag(Some(999)), LagSeverity::Acceptable);
        assert_eq!(classify_lag(Some(1000)), LagSeverity::High);
        assert_eq!(classify_lag(Some(60_000)), LagSeverity::High);
    }

    #[test]
    fn test_latency_tiers() {
        assert_eq!(classify_latency(None), LatencyTier::Offline);
        assert_eq!(classify_latency(Some(20)), LatencyTier::Fast);
        assert_eq!(classify_latency(Some(100)), LatencyTier::Moderate);
        assert_eq!(classify_latency(Some(199)), LatencyTier::Moderate);
        assert_eq!(classify_latency(Some(200)), LatencyTier::Slow);
    }

    #[test]
    fn test_health_requires_both_roles() {
        let ok = |role| ConnectivityResult::connected(role, Duration::from_millis(2));
        let bad = |role| ConnectivityResult::failed(role, "connect ECONNREFUSED");

        assert_eq!(
            HealthSnapshot::new(ok(Role::Primary), ok(Role::Replica)).status,
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthSnapshot::new(bad(Role::Primary), ok(Role::Replica)).status,
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthSnapshot::new(ok(Role::Primary), bad(Role::Replica)).status,
            HealthStatus::Degraded
        );
    }

    #[test]
    fn test_latency_snapshot_passes_samples_through() {
        let samples = vec![
            LatencySample {
                endpoint: Endpoint::new("ap-northeast-2", "http://seoul/health"),
                latency: Some(Duration::from_millis(20)),
            },
            LatencySample {
                endpoint: Endpoint::new("us-east-1", "http://us-east/health"),
                latency: None,
            },
        ];
        let snapshot = LatencySnapshot::new("us-west-2", samples);

        assert_eq!(snapshot.endpoints.len(), 2);
        assert_eq!(snapshot.endpoints[0].latency_ms, Some(20));
        assert!(snapshot.endpoints[0].online);
        assert_eq!(snapshot.endpoints[1].latency_ms, None);
        assert_eq!(snapshot.endpoints[1].tier, LatencyTier::Offline);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["current_region"], "us-west-2");
        assert!(json["endpoints"][1]["latency_ms"].is_null());
    }

    #[test]
    fn test_metrics_snapshot_classifies_raw_lag() {
        let snapshot = MetricsSnapshot::new("us-east-1", Some(750), 4);
        assert_eq!(snapshot.database.lag_severity, LagSeverity::Acceptable);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["database"]["lag_severity"], "acceptable");
        assert_eq!(json["database"]["connections"], 4);
    }
}
