//! Write-then-poll replication lag estimation.
//!
//! A marker row is written to the primary, then the replica is polled at a
//! fixed interval until the row shows up or the attempt budget runs out.
//! Observed lag is the wall-clock delta between the write and the first
//! successful read. Running out of attempts is an observation, not an error;
//! only a failed write is fatal.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::{Store, StoreError};

/// Time source for the estimator, so tests can run the poll loop without
/// real delays.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to write replication marker: {0}")]
    WriteFailure(#[source] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicationSettings {
    pub max_attempts: u32,
    pub interval: Duration,
    /// Bound on each individual store call.
    pub query_timeout: Duration,
}

impl Default for ReplicationSettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_millis(100),
            query_timeout: Duration::from_secs(5),
        }
    }
}

impl ReplicationSettings {
    /// The reported wait budget: attempts times interval.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Marker {
    id: i64,
    written_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeState {
    Writing,
    Polling {
        marker: Marker,
        attempt: u32,
    },
    Found {
        marker: Marker,
        attempts: u32,
        read_at: DateTime<Utc>,
    },
    Exhausted {
        marker: Marker,
        attempts: u32,
    },
}

/// Outcome of one write-then-poll cycle. `lag` is set exactly when `found`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicationProbe {
    pub marker_id: i64,
    pub written_at: DateTime<Utc>,
    pub found: bool,
    pub lag: Option<Duration>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub interval: Duration,
}

impl ReplicationProbe {
    pub fn lag_ms(&self) -> Option<i64> {
        self.lag.map(|lag| lag.as_millis() as i64)
    }

    pub fn max_wait_ms(&self) -> u64 {
        (self.interval * self.max_attempts).as_millis() as u64
    }

    pub fn written_at_iso(&self) -> String {
        self.written_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

pub struct ReplicationLagEstimator {
    writer: Arc<dyn Store>,
    reader: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    settings: ReplicationSettings,
    region: String,
}

impl ReplicationLagEstimator {
    pub fn new(
        writer: Arc<dyn Store>,
        reader: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        settings: ReplicationSettings,
        region: impl Into<String>,
    ) -> Self {
        Self {
            writer,
            reader,
            clock,
            settings,
            region: region.into(),
        }
    }

    pub async fn run(&self) -> Result<ReplicationProbe, ProbeError> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut state = ProbeState::Writing;

        loop {
            state = match state {
                ProbeState::Writing => {
                    let marker = self.write_marker().await?;
                    debug!(
                        marker_id = marker.id,
                        region = %self.region,
                        "Replication marker written"
                    );
                    ProbeState::Polling { marker, attempt: 1 }
                }
                ProbeState::Polling { marker, attempt } => {
                    if attempt > 1 {
                        self.clock.sleep(self.settings.interval).await;
                    }
                    if self.is_visible(marker.id, attempt).await {
                        ProbeState::Found {
                            marker,
                            attempts: attempt,
                            read_at: self.clock.now(),
                        }
                    } else if attempt < max_attempts {
                        ProbeState::Polling {
                            marker,
                            attempt: attempt + 1,
                        }
                    } else {
                        ProbeState::Exhausted {
                            marker,
                            attempts: attempt,
                        }
                    }
                }
                ProbeState::Found {
                    marker,
                    attempts,
                    read_at,
                } => {
                    let lag = (read_at - marker.written_at)
                        .to_std()
                        .unwrap_or(Duration::ZERO);
                    info!(
                        marker_id = marker.id,
                        attempts,
                        lag_ms = lag.as_millis() as u64,
                        "Marker visible on replica"
                    );
                    return Ok(self.outcome(marker, attempts, Some(lag)));
                }
                ProbeState::Exhausted { marker, attempts } => {
                    warn!(
                        marker_id = marker.id,
                        attempts,
                        max_wait_ms = self.settings.max_wait().as_millis() as u64,
                        "Marker not visible on replica within wait budget"
                    );
                    return Ok(self.outcome(marker, attempts, None));
                }
            };
        }
    }

    async fn write_marker(&self) -> Result<Marker, ProbeError> {
        let written_at = self.clock.now();
        let id = tokio::time::timeout(
            self.settings.query_timeout,
            self.writer.insert_marker(&self.region, written_at),
        )
        .await
        .map_err(|_| StoreError::Timeout(self.settings.query_timeout))
        .and_then(|inserted| inserted)
        .map_err(ProbeError::WriteFailure)?;
        Ok(Marker { id, written_at })
    }

    /// A failed or timed-out read counts as "not visible yet".
    async fn is_visible(&self, id: i64, attempt: u32) -> bool {
        match tokio::time::timeout(self.settings.query_timeout, self.reader.marker_exists(id)).await
        {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                warn!(marker_id = id, attempt, error = %e, "Replica read failed");
                false
            }
            Err(_) => {
                warn!(marker_id = id, attempt, "Replica read timed out");
                false
            }
        }
    }

    fn outcome(&self, marker: Marker, attempts: u32, lag: Option<Duration>) -> ReplicationProbe {
        ReplicationProbe {
            marker_id: marker.id,
            written_at: marker.written_at,
            found: lag.is_some(),
            lag,
            attempts,
            max_attempts: self.settings.max_attempts.max(1),
            interval: self.settings.interval,
        }
    }
}
