use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::{
    db::{models::AlertKind, AlertStore},
    error::Result,
};

/// Suppresses repeat alerts of the same kind within a reporting window.
///
/// Kinds are independent: a recent `Cold` alert never suppresses a `Hot`
/// one and vice versa.
#[derive(Clone)]
pub struct NotificationDeduplicator {
    alerts: Arc<dyn AlertStore>,
}

impl NotificationDeduplicator {
    pub fn new(alerts: Arc<dyn AlertStore>) -> Self {
        Self { alerts }
    }

    /// `true` iff no `kind` alert for `device_id` was recorded in the
    /// `reporting_window_minutes` up to `now`.
    pub async fn should_alert(
        &self,
        device_id: &str,
        kind: AlertKind,
        reporting_window_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let from = now - Duration::minutes(reporting_window_minutes);
        let recent = self.alerts.since(device_id, from).await?;

        match recent.iter().rev().find(|a| a.kind == kind) {
            Some(previous) => {
                debug!(
                    device_id = %device_id,
                    kind = %kind,
                    previous_at = %previous.timestamp_utc,
                    "Alert suppressed by an earlier one in the reporting window"
                );
                Ok(false)
            }
            None => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::db::{memory::MemoryStore, models::AlertRecord};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 10, 7, 0, 0).unwrap()
    }

    fn record(kind: AlertKind, at: DateTime<Utc>) -> AlertRecord {
        AlertRecord {
            device_id: "dev1".into(),
            timestamp_utc: at,
            kind,
            comfort_min: 19.0,
            comfort_max: 23.0,
            observed_temperature: 17.2,
            evaluation_window_minutes: 30,
        }
    }

    async fn dedup_with(records: &[AlertRecord]) -> NotificationDeduplicator {
        let store = MemoryStore::<AlertRecord>::new();
        for r in records {
            store.append(r).await.unwrap();
        }
        NotificationDeduplicator::new(Arc::new(store))
    }

    #[tokio::test]
    async fn no_history_allows_alert() {
        let dedup = dedup_with(&[]).await;
        assert!(dedup.should_alert("dev1", AlertKind::Cold, 30, t0()).await.unwrap());
    }

    #[tokio::test]
    async fn same_kind_inside_window_is_suppressed() {
        let dedup = dedup_with(&[record(AlertKind::Cold, t0())]).await;
        let later = t0() + Duration::minutes(10);
        assert!(!dedup.should_alert("dev1", AlertKind::Cold, 30, later).await.unwrap());
    }

    #[tokio::test]
    async fn same_kind_outside_window_is_allowed() {
        let dedup = dedup_with(&[record(AlertKind::Cold, t0())]).await;
        let later = t0() + Duration::minutes(40);
        assert!(dedup.should_alert("dev1", AlertKind::Cold, 30, later).await.unwrap());
    }

    #[tokio::test]
    async fn other_kind_never_suppresses() {
        let dedup = dedup_with(&[record(AlertKind::Cold, t0())]).await;
        let later = t0() + Duration::minutes(5);
        assert!(dedup.should_alert("dev1", AlertKind::Hot, 30, later).await.unwrap());
    }

    #[tokio::test]
    async fn other_devices_do_not_suppress() {
        let mut other = record(AlertKind::Cold, t0());
        other.device_id = "dev2".into();
        let dedup = dedup_with(&[other]).await;
        let later = t0() + Duration::minutes(5);
        assert!(dedup.should_alert("dev1", AlertKind::Cold, 30, later).await.unwrap());
    }

    #[tokio::test]
    async fn window_start_is_inclusive() {
        let dedup = dedup_with(&[record(AlertKind::Hot, t0())]).await;
        let exactly = t0() + Duration::minutes(30);
        assert!(!dedup.should_alert("dev1", AlertKind::Hot, 30, exactly).await.unwrap());
    }
}
