//! In-process fakes for the external collaborators, shared by unit tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    credential_blob::MemoryCredentialBlob,
    db::models::Reading,
    error::{MonitorError, Result},
    nest::{ThermostatApi, TokenIssuer},
    notifier::Notifier,
    token_store::{Credential, TokenStore},
};

pub(crate) fn reading(device_id: &str, ts: DateTime<Utc>, temp_c: f64) -> Reading {
    Reading {
        device_id: device_id.to_owned(),
        timestamp_utc: ts,
        ambient_temperature_c: temp_c,
        ambient_temperature_f: None,
        humidity: None,
        hvac_mode: None,
        hvac_state: None,
        previous_hvac_mode: None,
        target_temperature_c: None,
        target_temperature_f: None,
        target_temperature_high_c: None,
        target_temperature_low_c: None,
        has_fan: None,
        fan_timer_active: None,
        is_locked: None,
        is_online: None,
        structure_id: None,
        name: None,
    }
}

/// Issues `token-1`, `token-2`, ... and counts calls.
#[derive(Default)]
pub(crate) struct CountingIssuer {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingIssuer {
    pub(crate) fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenIssuer for CountingIssuer {
    async fn issue(&self) -> Result<Credential> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(MonitorError::Auth("token endpoint unreachable".into()));
        }
        Ok(Credential {
            access_token: format!("token-{n}"),
            expires_in_seconds: 3600,
            obtained_at: Utc::now(),
        })
    }
}

/// Token store backed by a fresh counting issuer and an empty blob.
pub(crate) fn token_store() -> (TokenStore, Arc<CountingIssuer>) {
    let issuer = Arc::new(CountingIssuer::default());
    let store = TokenStore::new(issuer.clone(), Arc::new(MemoryCredentialBlob::new()), false);
    (store, issuer)
}

/// Vendor API that replays scripted outcomes in order, then keeps answering
/// with `fallback_temp`.
pub(crate) struct ScriptedApi {
    script: Mutex<VecDeque<Result<f64>>>,
    fallback_temp: f64,
    delay: Option<Duration>,
    calls: AtomicUsize,
    tokens_seen: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub(crate) fn new(fallback_temp: f64) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback_temp,
            delay: None,
            calls: AtomicUsize::new(0),
            tokens_seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_script(self, script: Vec<Result<f64>>) -> Self {
        *self.script.lock().unwrap() = script.into();
        self
    }

    /// Simulated upstream latency (honours a paused tokio clock).
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn tokens_seen(&self) -> Vec<String> {
        self.tokens_seen.lock().unwrap().clone()
    }

    async fn next(&self, credential: &Credential) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens_seen
            .lock()
            .unwrap()
            .push(credential.access_token.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(self.fallback_temp))
    }
}

#[async_trait]
impl ThermostatApi for ScriptedApi {
    async fn fetch(&self, device_id: &str, credential: &Credential) -> Result<Reading> {
        let temp = self.next(credential).await?;
        Ok(reading(device_id, Utc::now(), temp))
    }

    async fn list(&self, credential: &Credential) -> Result<serde_json::Value> {
        let temp = self.next(credential).await?;
        Ok(serde_json::json!({ "dev1": { "ambient_temperature_c": temp } }))
    }
}

/// Captures delivered messages; optionally rejects every delivery.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingNotifier {
    pub(crate) fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        if self.fail {
            return Err(MonitorError::Notify("webhook returned 500".into()));
        }
        self.sent.lock().unwrap().push(message.to_owned());
        Ok(())
    }
}
