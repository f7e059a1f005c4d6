pub mod memory;
pub mod models;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use self::models::{AlertRecord, Reading};

pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Append-only, per-device time-ordered log of thermostat readings.
///
/// `append` returns `false` when a reading with the same
/// `(device_id, row_key)` already exists; the stored row is left untouched.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    async fn append(&self, reading: &Reading) -> crate::error::Result<bool>;

    /// Readings for `device_id` with a row key at or after `from`, oldest first.
    async fn since(
        &self,
        device_id: &str,
        from: DateTime<Utc>,
    ) -> crate::error::Result<Vec<Reading>>;
}

/// Append-only, per-device time-ordered log of delivered alerts.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn append(&self, alert: &AlertRecord) -> crate::error::Result<bool>;

    /// Alerts for `device_id` with a row key at or after `from`, oldest first.
    async fn since(
        &self,
        device_id: &str,
        from: DateTime<Utc>,
    ) -> crate::error::Result<Vec<AlertRecord>>;
}
