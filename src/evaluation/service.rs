use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    db::{
        models::{AlertKind, AlertRecord},
        AlertStore, ReadingStore,
    },
    dedup::NotificationDeduplicator,
    error::Result,
    evaluator::{self, ComfortRange, EvaluationWindow},
    jobs::{self, PassSummary},
    notifier::{MessageTemplates, Notifier},
};

/// Thresholds and windows used by every evaluation pass.
#[derive(Debug, Clone)]
pub struct EvaluationSettings {
    pub comfort_range: ComfortRange,
    pub check_range_minutes: i64,
    pub reporting_window_minutes: i64,
    pub templates: MessageTemplates,
}

impl EvaluationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            comfort_range: config.comfort_range,
            check_range_minutes: config.check_range_minutes,
            reporting_window_minutes: config.reporting_window_minutes,
            templates: config.templates.clone(),
        }
    }
}

/// What a single device evaluation ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationOutcome {
    /// Window empty, in range, or mixed.
    Comfortable,
    /// Anomalous, but an alert of this kind was already sent recently.
    Suppressed(AlertKind),
    /// Alert delivered and recorded.
    Alerted(AlertKind),
}

pub struct EvaluationService {
    readings: Arc<dyn ReadingStore>,
    alerts: Arc<dyn AlertStore>,
    dedup: NotificationDeduplicator,
    notifier: Arc<dyn Notifier>,
    settings: EvaluationSettings,
    device_ids: Vec<String>,
    interval: Duration,
    // Serializes dedupe -> notify -> record per device.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl EvaluationService {
    pub fn new(
        readings: Arc<dyn ReadingStore>,
        alerts: Arc<dyn AlertStore>,
        notifier: Arc<dyn Notifier>,
        settings: EvaluationSettings,
        device_ids: Vec<String>,
        interval_secs: u64,
    ) -> Self {
        Self {
            readings,
            dedup: NotificationDeduplicator::new(alerts.clone()),
            alerts,
            notifier,
            settings,
            device_ids,
            interval: Duration::from_secs(interval_secs),
            locks: DashMap::new(),
        }
    }

    /// Runs the evaluation loop indefinitely.
    /// Spawn this via `tokio::spawn`.
    pub async fn run(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            check_range_minutes = self.settings.check_range_minutes,
            reporting_window_minutes = self.settings.reporting_window_minutes,
            "Comfort evaluation loop started"
        );
        let mut ticker = jobs::ticker(self.interval);

        loop {
            ticker.tick().await;
            let summary = self.run_once(Utc::now()).await;
            debug!(succeeded = summary.succeeded, failed = summary.failed, "Evaluation pass complete");
        }
    }

    pub async fn run_once(&self, now: DateTime<Utc>) -> PassSummary {
        let mut summary = PassSummary::default();
        for device_id in &self.device_ids {
            let outcome = self.evaluate_device(device_id, now).await;
            if let Err(e) = &outcome {
                error!(
                    device_id = %device_id,
                    error = %e,
                    error_kind = e.kind(),
                    "Comfort evaluation failed"
                );
            }
            summary.record(&outcome);
        }
        summary
    }

    /// Evaluate the window ending at `now` for one device and alert if it is
    /// uniformly out of range and not already reported.
    ///
    /// The alert is recorded only after the notifier accepted it.
    pub async fn evaluate_device(&self, device_id: &str, now: DateTime<Utc>) -> Result<EvaluationOutcome> {
        let settings = &self.settings;
        let window = EvaluationWindow::ending_at(now, settings.check_range_minutes);
        let readings: Vec<_> = self
            .readings
            .since(device_id, window.start)
            .await?
            .into_iter()
            .filter(|r| r.timestamp_utc <= window.end)
            .collect();

        let result = evaluator::evaluate(device_id, window, &readings, settings.comfort_range);
        let (Some(kind), Some(observed)) = (result.kind, result.observed_temperature) else {
            debug!(device_id = %device_id, readings = readings.len(), "Temperature within comfort range");
            return Ok(EvaluationOutcome::Comfortable);
        };

        let lock = self.locks.entry(device_id.to_owned()).or_default().clone();
        let _guard = lock.lock().await;

        if !self
            .dedup
            .should_alert(device_id, kind, settings.reporting_window_minutes, now)
            .await?
        {
            return Ok(EvaluationOutcome::Suppressed(kind));
        }

        let message = settings.templates.render(
            kind,
            device_id,
            observed,
            settings.check_range_minutes,
            settings.comfort_range,
        );
        self.notifier.send(&message).await?;
        info!(device_id = %device_id, kind = %kind, temperature_c = observed, "Comfort alert sent");

        let record = AlertRecord {
            device_id: device_id.to_owned(),
            timestamp_utc: now,
            kind,
            comfort_min: settings.comfort_range.min(),
            comfort_max: settings.comfort_range.max(),
            observed_temperature: observed,
            evaluation_window_minutes: settings.check_range_minutes,
        };
        match self.alerts.append(&record).await {
            Ok(true) => {}
            Ok(false) => warn!(
                device_id = %device_id,
                row_key = %record.row_key(),
                "Alert record already present for this second"
            ),
            Err(e) => {
                error!(
                    device_id = %device_id,
                    kind = %kind,
                    error = %e,
                    error_kind = e.kind(),
                    "Alert delivered but not recorded; it may be sent again"
                );
                return Err(e);
            }
        }

        Ok(EvaluationOutcome::Alerted(kind))
    }
}
