use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    credential_blob::CredentialBlob,
    error::{MonitorError, Result},
    nest::TokenIssuer,
};

/// Bearer credential issued by the vendor token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    /// Validity period in seconds, as reported by the token endpoint.
    #[serde(rename = "expires_in")]
    pub expires_in_seconds: i64,
    pub obtained_at: DateTime<Utc>,
}

impl Credential {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.obtained_at + Duration::seconds(self.expires_in_seconds)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() <= now
    }
}

/// Resolves, caches and persists the bearer credential.
///
/// By default expiry is discovered reactively: a stored credential is
/// returned as-is until a caller asks for a forced refresh after the vendor
/// rejects it. With `proactive` set, credentials past their expiry are
/// treated as absent.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<Inner>,
}

struct Inner {
    issuer: Arc<dyn TokenIssuer>,
    blob: Arc<dyn CredentialBlob>,
    proactive: bool,
    /// Serializes resolution so refreshes never interleave blob writes.
    current: Mutex<Option<Credential>>,
}

impl TokenStore {
    pub fn new(issuer: Arc<dyn TokenIssuer>, blob: Arc<dyn CredentialBlob>, proactive: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                issuer,
                blob,
                proactive,
                current: Mutex::new(None),
            }),
        }
    }

    /// Return the current credential, issuing a new one when `force_refresh`
    /// is set or nothing usable is cached or persisted.
    pub async fn resolve(&self, force_refresh: bool) -> Result<Credential> {
        let mut guard = self.inner.current.lock().await;

        if !force_refresh {
            if guard.is_none() {
                *guard = self.load_persisted().await?;
            }
            if let Some(cred) = guard.as_ref() {
                if self.inner.proactive && cred.is_expired_at(Utc::now()) {
                    info!(expired_at = %cred.expires_at(), "Stored credential expired, refreshing");
                } else {
                    debug!("Using existing credential");
                    return Ok(cred.clone());
                }
            }
        }

        info!(force_refresh, "Obtaining new credential");
        let cred = self.inner.issuer.issue().await?;

        let serialized = serde_json::to_string(&cred)
            .map_err(|e| MonitorError::Store(format!("failed to serialize credential: {e}")))?;
        self.inner.blob.store(&serialized).await?;

        *guard = Some(cred.clone());
        Ok(cred)
    }

    async fn load_persisted(&self) -> Result<Option<Credential>> {
        let Some(raw) = self.inner.blob.load().await? else {
            return Ok(None);
        };

        match serde_json::from_str::<Credential>(&raw) {
            Ok(cred) => Ok(Some(cred)),
            Err(e) => {
                warn!(error = %e, "Persisted credential is unreadable; treating as absent");
                Ok(None)
            }
        }
    }
}
