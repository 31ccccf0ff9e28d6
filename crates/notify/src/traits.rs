//! Delivery trait definition and shared error types.

use crate::payload::AlertPayload;

/// Errors that can occur during alert delivery.
///
/// These never leave the crate's public `bool`-returning surface; they exist
/// so delivery failures are logged with a category.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl NotifyError {
    /// Short failure category for log fields.
    pub fn category(&self) -> &'static str {
        match self {
            NotifyError::Http(e) if e.is_timeout() => "timeout",
            NotifyError::Http(e) if e.is_connect() => "connect",
            NotifyError::Http(_) => "http",
            NotifyError::Status(_) => "status",
            NotifyError::Encode(_) => "encode",
        }
    }
}

/// Something that can hand an alert payload to a webhook.
///
/// Implementations must never panic or propagate errors: the answer is a
/// plain "was it accepted".
#[async_trait::async_trait]
pub trait Delivery: Send + Sync {
    /// Deliver `payload` to `url`. Returns `true` iff it was accepted.
    async fn post(&self, url: &str, payload: &AlertPayload) -> bool;

    /// Test connectivity with a sample alert.
    async fn test(&self, url: &str) -> bool {
        self.post(url, &AlertPayload::connectivity_test()).await
    }

    /// Human-readable name for this channel (e.g., "webhook").
    fn channel_name(&self) -> &str;
}
