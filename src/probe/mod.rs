//! Measurement primitives: peer HTTP latency, store connectivity and
//! replication lag.
//!
//! Every measurement here either carries a non-negative latency or is
//! explicitly marked as failed; the constructors are the only way to build
//! the result types, so the two can never be set together.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

pub mod connectivity;
pub mod fanout;
pub mod http;
pub mod replication;

pub use connectivity::check_connectivity;
pub use fanout::LatencySampler;
pub use http::{EndpointProber, HttpProber};
pub use replication::{
    Clock, ProbeError, ReplicationLagEstimator, ReplicationProbe, ReplicationSettings, SystemClock,
};

/// A named peer region and the URL used to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub url: String,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Result of probing one peer endpoint. `latency` is `None` when the probe
/// failed or timed out.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySample {
    pub endpoint: Endpoint,
    pub latency: Option<Duration>,
}

impl LatencySample {
    /// Whole milliseconds, rounded to nearest.
    pub fn latency_ms(&self) -> Option<u64> {
        self.latency.map(round_millis)
    }

    pub fn is_online(&self) -> bool {
        self.latency.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Primary,
    Replica,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Primary => write!(f, "primary"),
            Role::Replica => write!(f, "replica"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityResult {
    pub role: Role,
    pub status: ConnectionStatus,
    latency: Option<Duration>,
    error: Option<String>,
}

impl ConnectivityResult {
    pub fn connected(role: Role, latency: Duration) -> Self {
        Self {
            role,
            status: ConnectionStatus::Connected,
            latency: Some(latency),
            error: None,
        }
    }

    pub fn failed(role: Role, error: impl Into<String>) -> Self {
        Self {
            role,
            status: ConnectionStatus::Error,
            latency: None,
            error: Some(error.into()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    /// Milliseconds rounded to two decimal places.
    pub fn latency_ms(&self) -> Option<f64> {
        self.latency.map(centi_millis)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

pub(crate) fn round_millis(d: Duration) -> u64 {
    (d.as_secs_f64() * 1000.0).round() as u64
}

pub(crate) fn centi_millis(d: Duration) -> f64 {
    (d.as_secs_f64() * 100_000.0).round() / 100.0
}
