use std::{future::Future, sync::Arc};

use tracing::warn;

use crate::{
    db::models::Reading,
    error::Result,
    nest::ThermostatApi,
    token_store::{Credential, TokenStore},
};

/// Position in the bounded retry sequence of a vendor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Uses whatever credential the token store already holds.
    Initial,
    /// Uses a freshly issued credential. Last attempt.
    AfterForcedRefresh,
}

impl Attempt {
    fn forces_refresh(self) -> bool {
        matches!(self, Attempt::AfterForcedRefresh)
    }

    fn next(self) -> Option<Attempt> {
        match self {
            Attempt::Initial => Some(Attempt::AfterForcedRefresh),
            Attempt::AfterForcedRefresh => None,
        }
    }
}

/// Token store + vendor API with a single forced-refresh retry.
///
/// Any failure of the vendor call (whatever its kind) triggers one retry
/// with a newly issued credential; a second failure is returned unchanged.
/// Per logical call that bounds upstream traffic to two vendor requests and
/// two token resolutions.
#[derive(Clone)]
pub struct ReadingFetcher {
    tokens: TokenStore,
    api: Arc<dyn ThermostatApi>,
}

impl ReadingFetcher {
    pub fn new(tokens: TokenStore, api: Arc<dyn ThermostatApi>) -> Self {
        Self { tokens, api }
    }

    /// Current reading for `device_id`, straight from the vendor.
    pub async fn get_reading(&self, device_id: &str) -> Result<Reading> {
        let api = &*self.api;
        self.with_credential(device_id, move |credential| async move {
            api.fetch(device_id, &credential).await
        })
        .await
    }

    /// The vendor's full thermostat collection, unmodified.
    pub async fn list_thermostats(&self) -> Result<serde_json::Value> {
        let api = &*self.api;
        self.with_credential("*", move |credential| async move {
            api.list(&credential).await
        })
        .await
    }

    /// IDs of every thermostat in the vendor collection, sorted.
    ///
    /// A collection that is not a JSON object yields no IDs.
    pub async fn discover_device_ids(&self) -> Result<Vec<String>> {
        let collection = self.list_thermostats().await?;
        let mut ids: Vec<String> = collection
            .as_object()
            .map(|devices| devices.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        Ok(ids)
    }

    async fn with_credential<T, F, Fut>(&self, target: &str, call: F) -> Result<T>
    where
        F: Fn(Credential) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = Attempt::Initial;
        loop {
            let credential = self.tokens.resolve(attempt.forces_refresh()).await?;
            match call(credential).await {
                Ok(value) => return Ok(value),
                Err(e) => match attempt.next() {
                    Some(next) => {
                        warn!(
                            device_id = %target,
                            error = %e,
                            error_kind = e.kind(),
                            "Vendor call failed; retrying with a refreshed credential"
                        );
                        attempt = next;
                    }
                    None => return Err(e),
                },
            }
        }
    }
}
