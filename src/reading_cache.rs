use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, RwLock},
    time::Instant,
};
use tracing::debug;

use crate::{db::models::Reading, error::Result, fetcher::ReadingFetcher};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CacheEntry {
    reading: Reading,
    fetched_at: Instant,
}

type Slot = Arc<Mutex<Option<CacheEntry>>>;

/// Read-through cache of the most recent `Reading` per device, in front of
/// the vendor API.
///
/// Each device owns a slot guarded by its own async mutex. The caller that
/// finds the slot stale performs the upstream fetch while holding the lock;
/// concurrent callers for the same device wait on it and then see the fresh
/// entry, so at most one vendor call per device is in flight. Devices never
/// contend with each other.
///
/// Wrapped in `Arc` so it can be cheaply cloned and shared across tasks.
#[derive(Clone)]
pub struct ReadingCache {
    inner: Arc<Inner>,
}

struct Inner {
    fetcher: ReadingFetcher,
    ttl: Duration,
    slots: RwLock<HashMap<String, Slot>>,
}

impl ReadingCache {
    pub fn new(fetcher: ReadingFetcher, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                ttl,
                slots: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Return the cached reading for `device_id` if it is younger than the
    /// TTL, otherwise fetch, cache and return a fresh one.
    ///
    /// A failed fetch leaves the previous entry in place.
    pub async fn get_or_fetch(&self, device_id: &str) -> Result<Reading> {
        let slot = self.slot(device_id).await;
        let result = {
            let mut entry = slot.lock().await;

            if let Some(cached) = entry.as_ref() {
                if cached.fetched_at.elapsed() < self.inner.ttl {
                    debug!(device_id = %device_id, "Reading cache hit");
                    return Ok(cached.reading.clone());
                }
            }

            debug!(device_id = %device_id, "Reading cache miss");
            self.fetch_into(device_id, &mut entry).await
        };
        if result.is_err() {
            self.evict_if_unused(device_id, &slot).await;
        }
        result
    }

    /// Fetch regardless of the entry's age and replace it.
    pub async fn refresh(&self, device_id: &str) -> Result<Reading> {
        let slot = self.slot(device_id).await;
        let result = {
            let mut entry = slot.lock().await;
            debug!(device_id = %device_id, "Forced reading cache refresh");
            self.fetch_into(device_id, &mut entry).await
        };
        if result.is_err() {
            self.evict_if_unused(device_id, &slot).await;
        }
        result
    }

    async fn fetch_into(&self, device_id: &str, entry: &mut Option<CacheEntry>) -> Result<Reading> {
        let reading = self.inner.fetcher.get_reading(device_id).await?;
        *entry = Some(CacheEntry {
            reading: reading.clone(),
            fetched_at: Instant::now(),
        });
        Ok(reading)
    }

    /// Drop a slot that never held a reading once nobody else refers to it,
    /// so ids that only ever fail do not accumulate.
    async fn evict_if_unused(&self, device_id: &str, slot: &Slot) {
        let mut slots = self.inner.slots.write().await;
        let ours = slots.get(device_id).is_some_and(|s| Arc::ptr_eq(s, slot));
        // The map and this caller; any other holder is a waiter.
        if !ours || Arc::strong_count(slot) > 2 {
            return;
        }
        let empty = slot.try_lock().map(|entry| entry.is_none()).unwrap_or(false);
        if empty {
            slots.remove(device_id);
            debug!(device_id = %device_id, "Dropped empty reading cache slot");
        }
    }

    #[cfg(test)]
    async fn slot_count(&self) -> usize {
        self.inner.slots.read().await.len()
    }

    async fn slot(&self, device_id: &str) -> Slot {
        if let Some(slot) = self.inner.slots.read().await.get(device_id) {
            return slot.clone();
        }
        self.inner
            .slots
            .write()
            .await
            .entry(device_id.to_owned())
            .or_default()
            .clone()
    }
}
