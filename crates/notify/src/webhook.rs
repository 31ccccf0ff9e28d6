//! HTTP webhook delivery.
//!
//! Posts the alert document as JSON with separate connect and read
//! timeouts. Single attempt, no retries and no redirects: a failed post is
//! logged and reported as `false`.

use std::time::Duration;

use alerter_core::{redact_url, Settings};

use crate::payload::AlertPayload;
use crate::traits::{Delivery, NotifyError};

/// Delivers alert payloads to a chat webhook.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
    open_timeout: Duration,
    read_timeout: Duration,
}

impl WebhookClient {
    /// Create a client with the given connect (`open_timeout`) and
    /// `read_timeout` bounds.
    pub fn new(open_timeout: Duration, read_timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .connect_timeout(open_timeout)
            .read_timeout(read_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            open_timeout,
            read_timeout,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, NotifyError> {
        Self::new(settings.open_timeout, settings.read_timeout)
    }

    pub fn open_timeout(&self) -> Duration {
        self.open_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    async fn try_post(&self, url: &str, payload: &AlertPayload) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(payload)?;

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }

        tracing::debug!(url = %redact_url(url), %status, "alert delivered");
        Ok(())
    }
}

#[async_trait::async_trait]
impl Delivery for WebhookClient {
    async fn post(&self, url: &str, payload: &AlertPayload) -> bool {
        let url = url.trim();
        if url.is_empty() {
            return false;
        }

        match self.try_post(url, payload).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    url = %redact_url(url),
                    category = e.category(),
                    error = %e,
                    "webhook post failed"
                );
                false
            }
        }
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_configured_timeouts() {
        let settings = Settings {
            open_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(3),
            ..Settings::default()
        };
        let client = WebhookClient::from_settings(&settings).unwrap();
        assert_eq!(client.open_timeout(), Duration::from_secs(2));
        assert_eq!(client.read_timeout(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn blank_url_is_rejected_without_request() {
        let client = WebhookClient::from_settings(&Settings::default()).unwrap();
        let payload = AlertPayload::connectivity_test();
        assert!(!client.post("", &payload).await);
        assert!(!client.post("   ", &payload).await);
    }

    #[tokio::test]
    async fn malformed_url_returns_false() {
        let client = WebhookClient::from_settings(&Settings::default()).unwrap();
        assert!(!client.post("not a url", &AlertPayload::connectivity_test()).await);
    }

    #[test]
    fn channel_name_is_webhook() {
        let client = WebhookClient::from_settings(&Settings::default()).unwrap();
        assert_eq!(client.channel_name(), "webhook");
    }
}
