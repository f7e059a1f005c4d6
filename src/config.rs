use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};

use crate::{evaluator::ComfortRange, notifier::MessageTemplates};

/// Upper bound for the evaluation and reporting windows (one year).
pub const MAX_WINDOW_MINUTES: i64 = 525_600;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub nest_client_id: String,
    pub nest_client_secret: String,
    /// One-time authorization code exchanged for an access token.
    pub nest_authorization_code: String,
    pub nest_api_base_url: String,
    pub nest_auth_base_url: String,
    /// Format: `"id1,id2,id3"`.
    pub device_ids: Vec<String>,
    pub comfort_range: ComfortRange,
    /// Length of the sliding evaluation window.
    pub check_range_minutes: i64,
    /// Minimum gap between two alerts of the same kind for one device.
    pub reporting_window_minutes: i64,
    pub cache_ttl: Duration,
    /// Applied to every outbound HTTP call.
    pub http_timeout: Duration,
    /// Sensor polling interval in seconds.
    pub poll_interval_secs: u64,
    /// Comfort evaluation interval in seconds.
    pub evaluation_interval_secs: u64,
    pub webhook_url: String,
    pub templates: MessageTemplates,
    /// Location of the persisted credential blob.
    pub credential_path: PathBuf,
    /// Treat credentials past `obtained_at + expires_in` as absent instead of
    /// waiting for the vendor to reject them.
    pub proactive_token_refresh: bool,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let target: f64 = parsed("COMFORT_TARGET_C", "21.0")?;
        let tolerance: f64 = parsed("COMFORT_TOLERANCE_C", "2.0")?;
        let comfort_range = ComfortRange::around(target, tolerance)
            .context("COMFORT_TARGET_C / COMFORT_TOLERANCE_C do not form a valid comfort range")?;

        let defaults = MessageTemplates::default();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            nest_client_id: required("NEST_CLIENT_ID")?,
            nest_client_secret: required("NEST_CLIENT_SECRET")?,
            nest_authorization_code: required("NEST_AUTHORIZATION_CODE")?,
            nest_api_base_url: optional("NEST_API_BASE_URL", "https://developer-api.nest.com"),
            nest_auth_base_url: optional("NEST_AUTH_BASE_URL", "https://api.home.nest.com"),
            device_ids: parse_device_ids(&optional("NEST_DEVICE_IDS", "")),
            comfort_range,
            check_range_minutes: window_minutes("CHECK_RANGE_MINUTES", "30")?,
            reporting_window_minutes: window_minutes("REPORTING_WINDOW_MINUTES", "60")?,
            cache_ttl: Duration::from_secs(parsed("CACHE_TTL_SECS", "60")?),
            http_timeout: Duration::from_secs(positive("HTTP_TIMEOUT_SECS", "10")?),
            poll_interval_secs: positive("POLL_INTERVAL_SECS", "300")?,
            evaluation_interval_secs: positive("EVALUATION_INTERVAL_SECS", "60")?,
            webhook_url: required("WEBHOOK_URL")?,
            templates: MessageTemplates {
                hot: optional("HOT_MESSAGE_TEMPLATE", &defaults.hot),
                cold: optional("COLD_MESSAGE_TEMPLATE", &defaults.cold),
            },
            credential_path: PathBuf::from(optional("CREDENTIAL_PATH", "state/nest-token.json")),
            proactive_token_refresh: parsed("NEST_PROACTIVE_TOKEN_REFRESH", "false")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: parsed("SERVER_PORT", "8080")?,
        })
    }
}

/// Parse `"id1, id2,id3"` into trimmed, non-empty device ids.
fn parse_device_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parsed<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    optional(key, default)
        .trim()
        .parse()
        .with_context(|| format!("{key} has an invalid value"))
}

fn positive<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value: T = parsed(key, default)?;
    anyhow::ensure!(value > T::default(), "{key} must be a positive integer");
    Ok(value)
}

fn window_minutes(key: &str, default: &str) -> Result<i64> {
    check_window_minutes(key, positive(key, default)?)
}

fn check_window_minutes(key: &str, minutes: i64) -> Result<i64> {
    anyhow::ensure!(
        minutes <= MAX_WINDOW_MINUTES,
        "{key} must be at most {MAX_WINDOW_MINUTES} minutes (got {minutes})"
    );
    Ok(minutes)
}
