use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, PgPool};
use std::time::Duration;
use tracing::info;

use super::{Store, StoreError};
use crate::config::AppConfig;

/// `Store` over one bounded Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        conn.ping().await?;
        Ok(())
    }

    async fn insert_marker(
        &self,
        region: &str,
        written_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO health_checks (region, timestamp) VALUES ($1, $2) RETURNING id",
        )
        .bind(region)
        .bind(written_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn marker_exists(&self, id: i64) -> Result<bool, StoreError> {
        let row = sqlx::query_scalar::<_, i64>("SELECT id FROM health_checks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn active_connections(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM pg_stat_activity WHERE datname = current_database()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn replay_lag_ms(&self) -> Result<Option<i64>, StoreError> {
        let lag = sqlx::query_scalar::<_, Option<f64>>(
            r#"SELECT CASE WHEN pg_is_in_recovery()
                   THEN (EXTRACT(EPOCH FROM (now() - pg_last_xact_replay_timestamp()))
                         * 1000)::float8
               END"#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(lag.map(|ms| ms.round() as i64))
    }

    async fn purge_markers_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM health_checks WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Primary and replica pools, built once at startup and handed to whatever
/// needs database access.
pub struct StorePools {
    pub writer: PgStore,
    pub reader: PgStore,
}

impl StorePools {
    /// Builds both pools without touching the network; connections are
    /// opened on first acquire.
    pub fn connect_lazy(config: &AppConfig) -> Self {
        let writer = lazy_pool(config, &config.db_writer_host);
        let reader = lazy_pool(config, &config.db_reader_host);
        info!(
            writer = %config.db_writer_host,
            reader = %config.db_reader_host,
            max_connections = config.db_max_connections,
            "Database connection pools initialized"
        );
        Self {
            writer: PgStore::new(writer),
            reader: PgStore::new(reader),
        }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS health_checks (
                id BIGSERIAL PRIMARY KEY,
                region TEXT NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL
            )"#,
        )
        .execute(&self.writer.pool)
        .await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.writer.pool.close().await;
        info!("Writer pool closed");
        self.reader.pool.close().await;
        info!("Reader pool closed");
    }
}

fn lazy_pool(config: &AppConfig, host: &str) -> PgPool {
    let mut options = PgConnectOptions::new().host(host).port(config.db_port);
    if !config.db_user.is_empty() {
        options = options.username(&config.db_user);
    }
    if !config.db_password.is_empty() {
        options = options.password(&config.db_password);
    }
    if !config.db_name.is_empty() {
        options = options.database(&config.db_name);
    }

    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_millis(config.db_acquire_timeout_ms))
        .connect_lazy_with(options)
}
