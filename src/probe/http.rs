use async_trait::async_trait;
use reqwest::{Client, redirect};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::version::user_agent;

/// Measures the round-trip time of a single request to a URL.
///
/// Implementations never fail: an unreachable, slow or broken peer yields
/// `None` so a single bad region cannot sink a whole snapshot. No retries
/// happen at this layer.
#[async_trait]
pub trait EndpointProber: Send + Sync {
    async fn probe(&self, url: &str) -> Option<Duration>;
}

/// Timed HTTP GET prober backed by a shared `reqwest` client.
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    /// `timeout` bounds the whole exchange, body included. Redirects are
    /// not followed: a 3xx answer is the measured round trip.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .user_agent(user_agent())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EndpointProber for HttpProber {
    async fn probe(&self, url: &str) -> Option<Duration> {
        let start_time = Instant::now();
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(url = %url, "Timeout measuring latency");
                return None;
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Error measuring latency");
                return None;
            }
        };

        // Drain the body so the measurement covers the full round trip.
        match response.bytes().await {
            Ok(_) => {
                let elapsed = start_time.elapsed();
                debug!(
                    url = %url,
                    latency_ms = elapsed.as_millis() as u64,
                    "Measured peer latency"
                );
                Some(elapsed)
            }
            Err(e) if e.is_timeout() => {
                warn!(url = %url, "Timeout reading response body");
                None
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Error reading response body");
                None
            }
        }
    }
}
