use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

pub mod postgres;

pub use postgres::{PgStore, StorePools};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// One side (primary or replica) of the observed database pair.
///
/// Marker rows live in `health_checks`: they are written on the primary and
/// read back from the replica to observe replication from the outside.
#[async_trait]
pub trait Store: Send + Sync {
    /// Acquires a connection, runs a liveness check and releases it.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Inserts a marker row and returns its identifier.
    async fn insert_marker(
        &self,
        region: &str,
        written_at: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    async fn marker_exists(&self, id: i64) -> Result<bool, StoreError>;

    /// Sessions currently open against this database.
    async fn active_connections(&self) -> Result<i64, StoreError>;

    /// Replay delay reported by the server itself. `None` on a primary or
    /// when nothing has been replayed yet.
    async fn replay_lag_ms(&self) -> Result<Option<i64>, StoreError>;

    /// Deletes marker rows written before `cutoff`.
    async fn purge_markers_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}
