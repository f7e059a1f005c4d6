use std::{sync::Arc, time::Duration};

use tracing::{debug, error, info};

use crate::{
    db::ReadingStore,
    error::Result,
    jobs::{self, PassSummary},
    reading_cache::ReadingCache,
};

pub struct PollingService {
    cache: ReadingCache,
    readings: Arc<dyn ReadingStore>,
    device_ids: Vec<String>,
    interval: Duration,
}

impl PollingService {
    pub fn new(
        cache: ReadingCache,
        readings: Arc<dyn ReadingStore>,
        device_ids: Vec<String>,
        interval_secs: u64,
    ) -> Self {
        Self {
            cache,
            readings,
            device_ids,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Returns the set of device IDs this service is configured to poll.
    pub fn device_ids(&self) -> &[String] {
        &self.device_ids
    }

    /// Runs the polling loop indefinitely.
    /// Spawn this via `tokio::spawn`.
    pub async fn run(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            devices = self.device_ids.len(),
            "Sensor polling loop started"
        );
        let mut ticker = jobs::ticker(self.interval);

        loop {
            ticker.tick().await;
            let summary = self.run_once().await;
            debug!(succeeded = summary.succeeded, failed = summary.failed, "Polling pass complete");
        }
    }

    /// Polls every configured device once. Failures are logged per device.
    pub async fn run_once(&self) -> PassSummary {
        let mut summary = PassSummary::default();
        for device_id in &self.device_ids {
            let outcome = self.poll_device(device_id).await;
            if let Err(e) = &outcome {
                error!(
                    device_id = %device_id,
                    error = %e,
                    error_kind = e.kind(),
                    "Failed to poll thermostat"
                );
            }
            summary.record(&outcome);
        }
        summary
    }

    /// Reads `device_id` through the cache and appends the reading to the
    /// reading log. Returns `false` if that exact reading was already stored
    /// (a cache hit within the same second bucket).
    pub async fn poll_device(&self, device_id: &str) -> Result<bool> {
        let reading = self.cache.get_or_fetch(device_id).await?;
        let stored = self.readings.append(&reading).await?;

        if stored {
            info!(
                device_id = %device_id,
                temperature_c = reading.ambient_temperature_c,
                hvac_state = ?reading.hvac_state,
                "Reading persisted"
            );
        } else {
            debug!(device_id = %device_id, row_key = %reading.row_key(), "Reading already stored");
        }
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{memory::MemoryStore, models::Reading},
        error::MonitorError,
        fetcher::ReadingFetcher,
        reading_cache::DEFAULT_TTL,
        testing::{token_store, ScriptedApi},
    };

    fn service(api: Arc<ScriptedApi>, devices: &[&str]) -> (PollingService, MemoryStore<Reading>) {
        let (tokens, _) = token_store();
        let cache = ReadingCache::new(ReadingFetcher::new(tokens, api), DEFAULT_TTL);
        let store = MemoryStore::<Reading>::new();
        let svc = PollingService::new(
            cache,
            Arc::new(store.clone()),
            devices.iter().map(|d| d.to_string()).collect(),
            300,
        );
        (svc, store)
    }

    #[tokio::test]
    async fn run_once_persists_one_reading_per_device() {
        let api = Arc::new(ScriptedApi::new(20.5));
        let (svc, store) = service(api.clone(), &["dev1", "dev2"]);

        let summary = svc.run_once().await;
        assert_eq!(summary, PassSummary { succeeded: 2, failed: 0 });
        assert_eq!(store.len().await, 2);

        let from = chrono::Utc::now() - chrono::Duration::minutes(1);
        let dev1 = store.since("dev1", from).await.unwrap();
        assert_eq!(dev1.len(), 1);
        assert_eq!(dev1[0].ambient_temperature_c, 20.5);
    }

    #[tokio::test]
    async fn failing_device_does_not_abort_the_pass() {
        let api = Arc::new(ScriptedApi::new(20.5).with_script(vec![
            Err(MonitorError::Transport("down".into())),
            Err(MonitorError::Transport("still down".into())),
        ]));
        let (svc, store) = service(api.clone(), &["broken", "dev2"]);

        let summary = svc.run_once().await;
        assert_eq!(summary, PassSummary { succeeded: 1, failed: 1 });
        assert_eq!(store.len().await, 1);
        assert_eq!(api.calls(), 3);
    }

    #[tokio::test]
    async fn cached_reading_is_not_stored_twice() {
        let api = Arc::new(ScriptedApi::new(20.5));
        let (svc, store) = service(api.clone(), &["dev1"]);

        assert!(svc.poll_device("dev1").await.unwrap());
        assert!(!svc.poll_device("dev1").await.unwrap());
        assert_eq!(store.len().await, 1);
        assert_eq!(api.calls(), 1);
    }

    #[test]
    fn device_ids_are_exposed_in_order() {
        let (svc, _) = service(Arc::new(ScriptedApi::new(20.0)), &["b", "a"]);
        assert_eq!(svc.device_ids(), ["b", "a"]);
    }
}
