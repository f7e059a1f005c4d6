use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use crate::{
    db::models::AlertKind,
    error::{MonitorError, Result},
    evaluator::ComfortRange,
};

/// Delivers a rendered alert message to the outside world.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Per-kind message templates.
///
/// Placeholders: `{device}`, `{temperature}`, `{minutes}`, `{min}`, `{max}`.
/// Temperatures are rendered with one decimal place.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageTemplates {
    pub hot: String,
    pub cold: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            hot: "Thermostat {device} has read above {max}°C for the last {minutes} minutes \
                  (now {temperature}°C, comfort range {min}–{max}°C)."
                .to_owned(),
            cold: "Thermostat {device} has read below {min}°C for the last {minutes} minutes \
                   (now {temperature}°C, comfort range {min}–{max}°C)."
                .to_owned(),
        }
    }
}

impl MessageTemplates {
    pub fn render(
        &self,
        kind: AlertKind,
        device_id: &str,
        temperature: f64,
        window_minutes: i64,
        range: ComfortRange,
    ) -> String {
        let template = match kind {
            AlertKind::Hot => &self.hot,
            AlertKind::Cold => &self.cold,
        };
        template
            .replace("{device}", device_id)
            .replace("{temperature}", &format!("{temperature:.1}"))
            .replace("{minutes}", &window_minutes.to_string())
            .replace("{min}", &format!("{:.1}", range.min()))
            .replace("{max}", &format!("{:.1}", range.max()))
    }
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Posts `{"text": message}` to a chat webhook (Slack-compatible).
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        let response = self
            .http
            .post(&self.url)
            .json(&WebhookPayload { text: message })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Webhook request failed");
                MonitorError::Notify(format!("webhook request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Webhook rejected notification");
            return Err(MonitorError::Notify(format!("webhook returned {status}: {body}")));
        }

        info!("Notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{body_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn range() -> ComfortRange {
        ComfortRange::new(19.0, 23.0).unwrap()
    }

    #[test]
    fn render_substitutes_every_placeholder() {
        let templates = MessageTemplates {
            hot: "{device} hot {temperature} over {minutes}m [{min},{max}]".into(),
            cold: "{device} cold {temperature} over {minutes}m [{min},{max}]".into(),
        };
        assert_eq!(
            templates.render(AlertKind::Cold, "dev1", 17.2, 30, range()),
            "dev1 cold 17.2 over 30m [19.0,23.0]"
        );
        assert_eq!(
            templates.render(AlertKind::Hot, "dev1", 24.26, 15, range()),
            "dev1 hot 24.3 over 15m [19.0,23.0]"
        );
    }

    #[test]
    fn default_templates_mention_device_and_temperature() {
        let msg = MessageTemplates::default().render(AlertKind::Hot, "hall", 25.0, 30, range());
        assert!(msg.contains("hall"));
        assert!(msg.contains("25.0"));
        assert!(msg.contains("30 minutes"));
        assert!(!msg.contains('{'));
    }

    #[tokio::test]
    async fn send_posts_text_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/abc"))
            .and(body_json(serde_json::json!({ "text": "it is cold" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(Client::new(), format!("{}/hooks/abc", server.uri()));
        notifier.send("it is cold").await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_notify_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no_service"))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(Client::new(), server.uri());
        let err = notifier.send("hello").await.unwrap_err();
        assert_eq!(err.kind(), "notify");
        assert!(err.to_string().contains("no_service"));
    }

    #[tokio::test]
    async fn unreachable_webhook_is_notify_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let notifier = WebhookNotifier::new(Client::new(), "http://127.0.0.1:9/hook");
        let err = notifier.send("hello").await.unwrap_err();
        assert_eq!(err.kind(), "notify");
    }
}
