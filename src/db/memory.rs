use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    models::{row_key, AlertRecord, Reading},
    AlertStore, ReadingStore,
};
use crate::error::Result;

/// Records that live in a `(device_id, row_key)` partitioned log.
pub trait Keyed: Clone + Send + Sync + 'static {
    fn device_id(&self) -> &str;
    fn row_key(&self) -> String;
}

impl Keyed for Reading {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn row_key(&self) -> String {
        Reading::row_key(self)
    }
}

impl Keyed for AlertRecord {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn row_key(&self) -> String {
        AlertRecord::row_key(self)
    }
}

/// In-process append store keyed by `(device_id, row_key)`.
///
/// The `BTreeMap` ordering gives the same lexical range semantics as the
/// Postgres tables. Cloning shares the underlying log.
#[derive(Clone)]
pub struct MemoryStore<T> {
    inner: Arc<RwLock<BTreeMap<(String, String), T>>>,
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl<T: Keyed> MemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert(&self, record: &T) -> bool {
        let key = (record.device_id().to_owned(), record.row_key());
        let mut guard = self.inner.write().await;
        if guard.contains_key(&key) {
            return false;
        }
        guard.insert(key, record.clone());
        true
    }

    async fn range(&self, device_id: &str, from: DateTime<Utc>) -> Vec<T> {
        let start = (device_id.to_owned(), row_key(from));
        self.inner
            .read()
            .await
            .range(start..)
            .take_while(|((id, _), _)| id == device_id)
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Number of records across every device.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl ReadingStore for MemoryStore<Reading> {
    async fn append(&self, reading: &Reading) -> Result<bool> {
        Ok(self.insert(reading).await)
    }

    async fn since(&self, device_id: &str, from: DateTime<Utc>) -> Result<Vec<Reading>> {
        Ok(self.range(device_id, from).await)
    }
}

#[async_trait]
impl AlertStore for MemoryStore<AlertRecord> {
    async fn append(&self, alert: &AlertRecord) -> Result<bool> {
        Ok(self.insert(alert).await)
    }

    async fn since(&self, device_id: &str, from: DateTime<Utc>) -> Result<Vec<AlertRecord>> {
        Ok(self.range(device_id, from).await)
    }
}
