use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::error;

use super::{Endpoint, EndpointProber, LatencySample};

/// Probes a fixed set of peer endpoints concurrently.
pub struct LatencySampler {
    prober: Arc<dyn EndpointProber>,
    endpoints: Vec<Endpoint>,
}

impl LatencySampler {
    pub fn new(prober: Arc<dyn EndpointProber>, endpoints: Vec<Endpoint>) -> Self {
        Self { prober, endpoints }
    }

    /// Runs one probe per endpoint and waits for all of them.
    ///
    /// Results come back in configured endpoint order regardless of which
    /// probe finishes first. Each probe is bounded by the prober's own
    /// timeout; nothing else is layered on top.
    pub async fn sample(&self) -> Vec<LatencySample> {
        let mut tasks = JoinSet::new();
        for (index, endpoint) in self.endpoints.iter().enumerate() {
            let prober = self.prober.clone();
            let url = endpoint.url.clone();
            tasks.spawn(async move { (index, prober.probe(&url).await) });
        }

        let mut slots: Vec<Option<Duration>> = vec![None; self.endpoints.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, latency)) => slots[index] = latency,
                // The slot stays empty, which reads as "offline".
                Err(e) => error!(error = %e, "Latency probe task failed"),
            }
        }

        self.endpoints
            .iter()
            .cloned()
            .zip(slots)
            .map(|(endpoint, latency)| LatencySample { endpoint, latency })
            .collect()
    }
}
