use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};

use super::{
    models::{row_key, AlertKind, AlertRecord, Reading},
    AlertStore, ReadingStore,
};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// `thermostat_readings` table. The full reading is kept as JSONB next to
/// the columns used for range queries.
#[derive(Clone)]
pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadingStore for PgReadingStore {
    async fn append(&self, reading: &Reading) -> Result<bool> {
        let done = sqlx::query(
            r#"
            INSERT INTO thermostat_readings
                (device_id, row_key, recorded_at, ambient_temperature_c, body)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (device_id, row_key) DO NOTHING
            "#,
        )
        .bind(&reading.device_id)
        .bind(reading.row_key())
        .bind(reading.timestamp_utc)
        .bind(reading.ambient_temperature_c)
        .bind(Json(reading))
        .execute(&self.pool)
        .await?;

        Ok(done.rows_affected() == 1)
    }

    async fn since(&self, device_id: &str, from: DateTime<Utc>) -> Result<Vec<Reading>> {
        let rows: Vec<Json<Reading>> = sqlx::query_scalar(
            r#"
            SELECT body
            FROM thermostat_readings
            WHERE device_id = $1
              AND row_key  >= $2
            ORDER BY row_key ASC
            "#,
        )
        .bind(device_id)
        .bind(row_key(from))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|Json(r)| r).collect())
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgAlertStore {
    pool: PgPool,
}

impl PgAlertStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AlertRow {
    device_id: String,
    recorded_at: DateTime<Utc>,
    kind: String,
    comfort_min: f64,
    comfort_max: f64,
    observed_temperature: f64,
    evaluation_window_minutes: i64,
}

impl TryFrom<AlertRow> for AlertRecord {
    type Error = crate::error::MonitorError;

    fn try_from(row: AlertRow) -> Result<Self> {
        Ok(Self {
            device_id: row.device_id,
            timestamp_utc: row.recorded_at,
            kind: row.kind.parse::<AlertKind>()?,
            comfort_min: row.comfort_min,
            comfort_max: row.comfort_max,
            observed_temperature: row.observed_temperature,
            evaluation_window_minutes: row.evaluation_window_minutes,
        })
    }
}

#[async_trait]
impl AlertStore for PgAlertStore {
    async fn append(&self, alert: &AlertRecord) -> Result<bool> {
        let done = sqlx::query(
            r#"
            INSERT INTO comfort_alerts
                (device_id, row_key, recorded_at, kind, comfort_min, comfort_max,
                 observed_temperature, evaluation_window_minutes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (device_id, row_key) DO NOTHING
            "#,
        )
        .bind(&alert.device_id)
        .bind(alert.row_key())
        .bind(alert.timestamp_utc)
        .bind(alert.kind.to_string())
        .bind(alert.comfort_min)
        .bind(alert.comfort_max)
        .bind(alert.observed_temperature)
        .bind(alert.evaluation_window_minutes)
        .execute(&self.pool)
        .await?;

        Ok(done.rows_affected() == 1)
    }

    async fn since(&self, device_id: &str, from: DateTime<Utc>) -> Result<Vec<AlertRecord>> {
        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT device_id,
                   recorded_at,
                   kind,
                   comfort_min,
                   comfort_max,
                   observed_temperature,
                   evaluation_window_minutes
            FROM comfort_alerts
            WHERE device_id = $1
              AND row_key  >= $2
            ORDER BY row_key ASC
            "#,
        )
        .bind(device_id)
        .bind(row_key(from))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AlertRecord::try_from).collect()
    }
}
