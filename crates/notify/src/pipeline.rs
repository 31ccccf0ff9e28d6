//! The notification pipeline.
//!
//! ```text
//! record ──▶ enabled? ──▶ duplicate? ──▶ build payload ──▶ deliver ──▶ bool
//!              │ no           │ yes
//!              ▼              ▼
//!            false          false
//! ```
//!
//! Dedup is always consulted before any network call, so a suppressed
//! duplicate never causes an outbound request.

use std::sync::Arc;

use alerter_core::{ErrorContext, ErrorRecord, Settings};

use crate::clock::{Clock, SystemClock};
use crate::dedup;
use crate::payload::{build_payload, AlertPayload};
use crate::traits::{Delivery, NotifyError};
use crate::webhook::WebhookClient;

/// Turns errors into deduplicated webhook alerts.
///
/// Stateless apart from the settings snapshot it was built with; cheap to
/// share behind an `Arc` and safe to call concurrently.
pub struct Alerter {
    settings: Settings,
    delivery: Arc<dyn Delivery>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Alerter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Alerter")
            .field("settings", &self.settings)
            .field("delivery", &self.delivery.channel_name())
            .finish_non_exhaustive()
    }
}

impl Alerter {
    /// Alerter delivering through a [`WebhookClient`] built from `settings`.
    pub fn new(settings: Settings) -> Result<Self, NotifyError> {
        let client = WebhookClient::from_settings(&settings)?;
        Ok(Self::with_delivery(settings, Arc::new(client)))
    }

    /// Alerter delivering through a caller-supplied channel.
    pub fn with_delivery(settings: Settings, delivery: Arc<dyn Delivery>) -> Self {
        let clock = Arc::new(SystemClock::new(settings.timezone));
        Self {
            settings,
            delivery,
            clock,
        }
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run `record` through the pipeline. Returns `true` iff an alert was
    /// delivered.
    pub async fn notify(&self, record: &ErrorRecord) -> bool {
        if !self.settings.enabled() {
            tracing::debug!(error_class = record.error_class(), "alerting disabled, skipping");
            return false;
        }

        if dedup::is_duplicate(record, &self.settings).await {
            tracing::debug!(
                error_class = record.error_class(),
                source_detail = record.source_detail().unwrap_or_default(),
                "duplicate error suppressed"
            );
            return false;
        }

        let payload = self.build_payload(record);
        let url = self.settings.webhook_url.as_deref().unwrap_or_default();
        self.delivery.post(url, &payload).await
    }

    /// Notify for an error raised in application code.
    pub async fn notify_error<E>(&self, error: &E, context: &ErrorContext) -> bool
    where
        E: std::error::Error + ?Sized,
    {
        let record = ErrorRecord::from_error(error, context, self.settings.max_error_length);
        self.notify(&record).await
    }

    /// Notify for an `anyhow` error, including its captured backtrace.
    pub async fn notify_anyhow(&self, error: &anyhow::Error, context: &ErrorContext) -> bool {
        let record = ErrorRecord::from_anyhow(error, context, self.settings.max_error_length);
        self.notify(&record).await
    }

    /// Build the alert document for `record` at the current time.
    pub fn build_payload(&self, record: &ErrorRecord) -> AlertPayload {
        build_payload(record, &self.settings, &self.clock.timestamp())
    }

    /// Post a fixed test alert, bypassing dedup.
    pub async fn send_test(&self) -> bool {
        if !self.settings.enabled() {
            return false;
        }
        let url = self.settings.webhook_url.as_deref().unwrap_or_default();
        self.delivery.test(url).await
    }
}
