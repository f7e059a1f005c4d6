pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    config::Config,
    db::models::Reading,
    error::{MonitorError, Result},
    token_store::Credential,
};

use self::models::{ThermostatData, TokenResponse};

/// Device-state API of the thermostat vendor. Implementations make exactly
/// one outbound call per method and never retry.
#[async_trait]
pub trait ThermostatApi: Send + Sync {
    /// Current state of one thermostat.
    async fn fetch(&self, device_id: &str, credential: &Credential) -> Result<Reading>;

    /// Full thermostat collection, exactly as the vendor returned it.
    async fn list(&self, credential: &Credential) -> Result<serde_json::Value>;
}

/// Opaque service that exchanges configured client credentials for a bearer
/// token.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self) -> Result<Credential>;
}

/// OAuth client registration used for the authorization-code exchange.
#[derive(Debug, Clone)]
pub struct OAuthApp {
    pub client_id: String,
    pub client_secret: String,
    pub authorization_code: String,
}

#[derive(Debug, Clone)]
pub struct NestClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: Client,
    api_base_url: String,
    auth_base_url: String,
    app: OAuthApp,
}

impl NestClient {
    /// `http` should carry the request timeout; the client adds none of its own.
    pub fn new(
        http: Client,
        api_base_url: impl Into<String>,
        auth_base_url: impl Into<String>,
        app: OAuthApp,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                api_base_url: trim_base(api_base_url.into()),
                auth_base_url: trim_base(auth_base_url.into()),
                app,
            }),
        }
    }

    pub fn from_config(http: Client, config: &Config) -> Self {
        Self::new(
            http,
            config.nest_api_base_url.clone(),
            config.nest_auth_base_url.clone(),
            OAuthApp {
                client_id: config.nest_client_id.clone(),
                client_secret: config.nest_client_secret.clone(),
                authorization_code: config.nest_authorization_code.clone(),
            },
        )
    }

    /// Bearer-authenticated GET, decoding the body as `T`.
    async fn get_json<T: DeserializeOwned>(&self, url: &str, credential: &Credential) -> Result<T> {
        let response = self
            .inner
            .http
            .get(url)
            .bearer_auth(&credential.access_token)
            .send()
            .await
            .map_err(MonitorError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::Remote { status, body });
        }

        let bytes = response.bytes().await.map_err(MonitorError::from_transport)?;
        serde_json::from_slice::<T>(&bytes).map_err(|e| MonitorError::Parse(e.to_string()))
    }
}

impl NestClient {
    /// `{api_base_url}/devices/thermostats/{device_id}`, with the id encoded
    /// as one path segment so `/`, `?` and `#` stay inside it.
    fn thermostat_url(&self, device_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.inner.api_base_url)
            .map_err(|e| MonitorError::Transport(format!("invalid API base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| MonitorError::Transport("API base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["devices", "thermostats", device_id]);
        Ok(url)
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_owned()
}

#[async_trait]
impl ThermostatApi for NestClient {
    async fn fetch(&self, device_id: &str, credential: &Credential) -> Result<Reading> {
        let url = self.thermostat_url(device_id)?;
        debug!(device_id = %device_id, url = %url, "Fetching thermostat");

        let data: ThermostatData = self.get_json(url.as_str(), credential).await?;
        Reading::from_vendor(device_id, Utc::now(), data)
    }

    async fn list(&self, credential: &Credential) -> Result<serde_json::Value> {
        let url = format!("{}/devices/thermostats/", self.inner.api_base_url);
        debug!(url = %url, "Listing thermostats");

        self.get_json(&url, credential).await
    }
}

#[async_trait]
impl TokenIssuer for NestClient {
    async fn issue(&self) -> Result<Credential> {
        let url = format!("{}/oauth2/access_token", self.inner.auth_base_url);
        let app = &self.inner.app;
        debug!(url = %url, "Requesting access token");

        let response = self
            .inner
            .http
            .post(&url)
            .form(&[
                ("client_id", app.client_id.as_str()),
                ("client_secret", app.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", app.authorization_code.as_str()),
            ])
            .send()
            .await
            .map_err(|e| MonitorError::Auth(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MonitorError::Auth(format!("failed to read token response: {e}")))?;
        if bytes.is_empty() {
            return Err(MonitorError::Auth("token endpoint returned no content".into()));
        }

        let token = serde_json::from_slice::<TokenResponse>(&bytes)
            .map_err(|e| MonitorError::Auth(format!("malformed token response: {e}")))?;
        if token.access_token.is_empty() {
            return Err(MonitorError::Auth("token response carries no access_token".into()));
        }

        Ok(Credential {
            access_token: token.access_token,
            expires_in_seconds: token.expires_in,
            obtained_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
