use std::time::{Duration, Instant};
use tracing::error;

use super::{ConnectivityResult, Role};
use crate::store::{Store, StoreError};

/// Times one acquire + liveness check + release round trip against `store`.
///
/// Failures never propagate: a pool that cannot hand out a working
/// connection, or one that takes longer than `timeout`, comes back as an
/// error result with no latency.
pub async fn check_connectivity(
    role: Role,
    store: &dyn Store,
    timeout: Duration,
) -> ConnectivityResult {
    let start_time = Instant::now();
    let outcome = match tokio::time::timeout(timeout, store.ping()).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(timeout)),
    };

    match outcome {
        Ok(()) => ConnectivityResult::connected(role, start_time.elapsed()),
        Err(e) => {
            error!(role = %role, error = %e, "Database connection test failed");
            ConnectivityResult::failed(role, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ConnectionStatus;
    use crate::store::testing::FakeStore;

    #[tokio::test]
    async fn test_reachable_store_is_connected() {
        let store = FakeStore::healthy();
        let result = check_connectivity(Role::Primary, &store, Duration::from_secs(1)).await;

        assert_eq!(result.status, ConnectionStatus::Connected);
        assert!(result.latency().is_some());
        assert!(result.error().is_none());
    }

    #[tokio::test]
    async fn test_failed_acquire_reports_error_without_latency() {
        let store = FakeStore {
            fail_ping: true,
            ..FakeStore::healthy()
        };
        let result = check_connectivity(Role::Primary, &store, Duration::from_secs(1)).await;

        assert_eq!(result.status, ConnectionStatus::Error);
        assert!(result.latency().is_none());
        assert!(result.error().unwrap().contains("pool timed out"));
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let store = FakeStore {
            ping_delay: Some(Duration::from_millis(500)),
            ..FakeStore::healthy()
        };
        let result = check_connectivity(Role::Replica, &store, Duration::from_millis(50)).await;

        assert_eq!(result.role, Role::Replica);
        assert!(!result.is_connected());
        assert!(result.error().unwrap().contains("timed out"));
    }
}
