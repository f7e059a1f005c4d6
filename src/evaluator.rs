//! Sliding-window comfort classification.
//!
//! A window is anomalous only when *every* reading in it is on the same side
//! of the comfort range. One in-range reading anywhere cancels the anomaly.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::db::models::{AlertKind, Reading};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InvalidComfortRange {
    #[error("comfort bounds must be finite (min={min}, max={max})")]
    NotFinite { min: f64, max: f64 },
    #[error("comfort min {min} must be below max {max}")]
    Inverted { min: f64, max: f64 },
}

/// Acceptable ambient temperature band in °C, `min < max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComfortRange {
    min: f64,
    max: f64,
}

impl ComfortRange {
    pub fn new(min: f64, max: f64) -> Result<Self, InvalidComfortRange> {
        if !min.is_finite() || !max.is_finite() {
            return Err(InvalidComfortRange::NotFinite { min, max });
        }
        if min >= max {
            return Err(InvalidComfortRange::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    /// `[target - tolerance, target + tolerance]`.
    pub fn around(target: f64, tolerance: f64) -> Result<Self, InvalidComfortRange> {
        Self::new(target - tolerance, target + tolerance)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Time span an evaluation looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvaluationWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EvaluationWindow {
    /// The `minutes` leading up to and including `end`.
    pub fn ending_at(end: DateTime<Utc>, minutes: i64) -> Self {
        Self {
            start: end - Duration::minutes(minutes),
            end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComfortWindowResult {
    pub device_id: String,
    /// `None` when the window is empty or not uniformly out of range.
    pub kind: Option<AlertKind>,
    /// Temperature of the latest reading in the window, if any.
    pub observed_temperature: Option<f64>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

/// Classify `readings` (all readings of `device_id` inside `window`).
pub fn evaluate(
    device_id: &str,
    window: EvaluationWindow,
    readings: &[Reading],
    range: ComfortRange,
) -> ComfortWindowResult {
    let observed_temperature = readings
        .iter()
        .max_by_key(|r| r.timestamp_utc)
        .map(|r| r.ambient_temperature_c);

    let kind = if readings.is_empty() {
        None
    } else if readings.iter().all(|r| r.ambient_temperature_c > range.max) {
        Some(AlertKind::Hot)
    } else if readings.iter().all(|r| r.ambient_temperature_c < range.min) {
        Some(AlertKind::Cold)
    } else {
        None
    };

    ComfortWindowResult {
        device_id: device_id.to_owned(),
        kind,
        observed_temperature,
        window_start: window.start,
        window_end: window.end,
    }
}
