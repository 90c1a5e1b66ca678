use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use crate::config::AppConfig;
use crate::probe::{
    Clock, EndpointProber, LatencySampler, ProbeError, ReplicationLagEstimator,
    ReplicationSettings, Role, check_connectivity,
};
use crate::snapshot::{HealthSnapshot, LatencySnapshot, MetricsSnapshot, ReplicationReport};
use crate::store::{Store, StoreError};

/// Entry point for the request handlers: owns the store handles and the
/// probes built on top of them.
pub struct MonitorService {
    region: String,
    writer: Arc<dyn Store>,
    reader: Arc<dyn Store>,
    db_probe_timeout: Duration,
    sampler: LatencySampler,
    estimator: ReplicationLagEstimator,
}

impl MonitorService {
    pub fn new(
        config: &AppConfig,
        writer: Arc<dyn Store>,
        reader: Arc<dyn Store>,
        prober: Arc<dyn EndpointProber>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let db_probe_timeout = Duration::from_millis(config.db_acquire_timeout_ms);
        let settings = ReplicationSettings {
            max_attempts: config.replication_max_attempts,
            interval: config.replication_interval(),
            query_timeout: db_probe_timeout,
        };

        Self {
            region: config.region.clone(),
            sampler: LatencySampler::new(prober, config.peer_endpoints()),
            estimator: ReplicationLagEstimator::new(
                writer.clone(),
                reader.clone(),
                clock,
                settings,
                config.region.clone(),
            ),
            writer,
            reader,
            db_probe_timeout,
        }
    }

    /// Primary and replica are checked concurrently on independent pools.
    pub async fn health_snapshot(&self) -> HealthSnapshot {
        let (writer, reader) = tokio::join!(
            check_connectivity(Role::Primary, self.writer.as_ref(), self.db_probe_timeout),
            check_connectivity(Role::Replica, self.reader.as_ref(), self.db_probe_timeout),
        );
        HealthSnapshot::new(writer, reader)
    }

    pub async fn latency_snapshot(&self) -> LatencySnapshot {
        let samples = self.sampler.sample().await;
        LatencySnapshot::new(self.region.clone(), samples)
    }

    pub async fn run_replication_probe(
        &self,
        test_data: &str,
    ) -> Result<ReplicationReport, ProbeError> {
        let probe = self.estimator.run().await?;
        Ok(ReplicationReport::new(&probe, test_data))
    }

    /// Server-reported replay lag and connection count from the replica.
    pub async fn metrics_snapshot(&self) -> MetricsSnapshot {
        let (lag, connections) = tokio::join!(
            self.bounded(self.reader.replay_lag_ms()),
            self.bounded(self.reader.active_connections()),
        );

        let replication_lag_ms = lag.unwrap_or_else(|e| {
            error!(error = %e, "Error fetching replication lag");
            None
        });
        let connections = connections.unwrap_or_else(|e| {
            error!(error = %e, "Error fetching database connections");
            0
        });

        MetricsSnapshot::new(self.region.clone(), replication_lag_ms, connections)
    }

    /// Drops marker rows older than `retention`. Returns how many went.
    pub async fn purge_expired_markers(&self, retention: Duration) -> Result<u64, StoreError> {
        let retention = chrono::Duration::from_std(retention)
            .unwrap_or_else(|_| chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(retention)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        self.bounded(self.writer.purge_markers_before(cutoff)).await
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.db_probe_timeout, fut)
            .await
            .unwrap_or(Err(StoreError::Timeout(self.db_probe_timeout)))
    }
}
