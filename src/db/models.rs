use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{MonitorError, Result},
    nest::models::ThermostatData,
};

/// Row keys are UTC timestamps rendered on a 24-hour clock, so lexical order
/// matches chronological order within a device partition.
pub const ROW_KEY_FORMAT: &str = "%Y%m%d%H%M%S";

pub fn row_key(ts: DateTime<Utc>) -> String {
    ts.format(ROW_KEY_FORMAT).to_string()
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// One thermostat snapshot as stored in the reading log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Reading {
    pub device_id: String,
    /// Instant the snapshot was fetched from the vendor.
    pub timestamp_utc: DateTime<Utc>,
    /// Degrees Celsius
    pub ambient_temperature_c: f64,
    /// Degrees Fahrenheit
    pub ambient_temperature_f: Option<i64>,
    /// Relative humidity percentage
    pub humidity: Option<i64>,
    /// `"heat"` | `"cool"` | `"heat-cool"` | `"eco"` | `"off"`
    pub hvac_mode: Option<String>,
    /// `"heating"` | `"cooling"` | `"off"`
    pub hvac_state: Option<String>,
    pub previous_hvac_mode: Option<String>,
    pub target_temperature_c: Option<f64>,
    pub target_temperature_f: Option<i64>,
    pub target_temperature_high_c: Option<f64>,
    pub target_temperature_low_c: Option<f64>,
    pub has_fan: Option<bool>,
    pub fan_timer_active: Option<bool>,
    pub is_locked: Option<bool>,
    pub is_online: Option<bool>,
    pub structure_id: Option<String>,
    pub name: Option<String>,
}

impl Reading {
    /// Build a reading from a vendor payload fetched at `fetched_at`.
    ///
    /// The ambient Celsius temperature is the only field the comfort logic
    /// depends on, so its absence is a parse failure rather than a default.
    pub fn from_vendor(
        device_id: &str,
        fetched_at: DateTime<Utc>,
        data: ThermostatData,
    ) -> Result<Self> {
        let ambient_temperature_c = data.ambient_temperature_c.ok_or_else(|| {
            MonitorError::Parse(format!(
                "thermostat {device_id}: missing field 'ambient_temperature_c'"
            ))
        })?;

        Ok(Self {
            device_id: device_id.to_owned(),
            timestamp_utc: fetched_at,
            ambient_temperature_c,
            ambient_temperature_f: data.ambient_temperature_f,
            humidity: data.humidity,
            hvac_mode: data.hvac_mode,
            hvac_state: data.hvac_state,
            previous_hvac_mode: data.previous_hvac_mode,
            target_temperature_c: data.target_temperature_c,
            target_temperature_f: data.target_temperature_f,
            target_temperature_high_c: data.target_temperature_high_c,
            target_temperature_low_c: data.target_temperature_low_c,
            has_fan: data.has_fan,
            fan_timer_active: data.fan_timer_active,
            is_locked: data.is_locked,
            is_online: data.is_online,
            structure_id: data.structure_id,
            name: data.name,
        })
    }

    pub fn row_key(&self) -> String {
        row_key(self.timestamp_utc)
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// Direction of a comfort-range violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Hot,
    Cold,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertKind::Hot => "hot",
            AlertKind::Cold => "cold",
        };
        f.write_str(s)
    }
}

impl FromStr for AlertKind {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hot" => Ok(Self::Hot),
            "cold" => Ok(Self::Cold),
            other => Err(MonitorError::Store(format!("unknown alert kind: {other:?}"))),
        }
    }
}

/// A delivered comfort alert. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AlertRecord {
    pub device_id: String,
    pub timestamp_utc: DateTime<Utc>,
    pub kind: AlertKind,
    pub comfort_min: f64,
    pub comfort_max: f64,
    pub observed_temperature: f64,
    pub evaluation_window_minutes: i64,
}

impl AlertRecord {
    pub fn row_key(&self) -> String {
        row_key(self.timestamp_utc)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample_reading() -> Reading {
        Reading {
            device_id: "dev1".into(),
            timestamp_utc: Utc.with_ymd_and_hms(2024, 1, 15, 14, 5, 9).unwrap(),
            ambient_temperature_c: 18.5,
            ambient_temperature_f: Some(65),
            humidity: Some(40),
            hvac_mode: Some("heat".into()),
            hvac_state: Some("heating".into()),
            previous_hvac_mode: None,
            target_temperature_c: Some(21.0),
            target_temperature_f: Some(70),
            target_temperature_high_c: None,
            target_temperature_low_c: None,
            has_fan: Some(true),
            fan_timer_active: Some(false),
            is_locked: Some(false),
            is_online: Some(true),
            structure_id: Some("struct-1".into()),
            name: Some("Hallway".into()),
        }
    }

    #[test]
    fn row_key_uses_24_hour_clock() {
        let morning = Utc.with_ymd_and_hms(2024, 1, 15, 2, 0, 0).unwrap();
        let afternoon = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        assert_eq!(row_key(afternoon), "20240115140000");
        assert!(row_key(morning) < row_key(afternoon));
    }

    #[test]
    fn row_keys_sort_across_day_boundaries() {
        let late = Utc.with_ymd_and_hms(2024, 1, 15, 23, 59, 59).unwrap();
        let next = Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap();
        assert!(row_key(late) < row_key(next));
    }

    #[test]
    fn reading_serde_roundtrip() {
        let r = sample_reading();
        let json = serde_json::to_string(&r).unwrap();
        let back: Reading = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn alert_record_serde_roundtrip() {
        let a = AlertRecord {
            device_id: "dev1".into(),
            timestamp_utc: Utc.with_ymd_and_hms(2024, 1, 15, 14, 5, 9).unwrap(),
            kind: AlertKind::Cold,
            comfort_min: 19.0,
            comfort_max: 23.0,
            observed_temperature: 17.2,
            evaluation_window_minutes: 30,
        };
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["kind"], "cold");
        let back: AlertRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn alert_kind_parses_its_display_form() {
        for kind in [AlertKind::Hot, AlertKind::Cold] {
            assert_eq!(kind.to_string().parse::<AlertKind>().unwrap(), kind);
        }
        assert!("warm".parse::<AlertKind>().is_err());
    }

    #[test]
    fn from_vendor_requires_ambient_temperature() {
        let data: ThermostatData = serde_json::from_str(r#"{"humidity": 40}"#).unwrap();
        let err = Reading::from_vendor("dev1", Utc::now(), data).unwrap_err();
        assert_eq!(err.kind(), "parse");
    }
}
