//! Process-wide default settings.
//!
//! A convenience layer over [`Alerter`]: each call snapshots the current
//! settings and builds a fresh alerter from them, so `configure` takes effect
//! on the next notification. The HTTP client underneath is shared and only
//! rebuilt when the timeouts change. Hosts that prefer explicit wiring can
//! ignore this module entirely.

use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use alerter_core::{ErrorContext, Settings};

use crate::pipeline::Alerter;
use crate::traits::NotifyError;
use crate::webhook::WebhookClient;

static SETTINGS: OnceLock<RwLock<Settings>> = OnceLock::new();
static CLIENT: Mutex<Option<Arc<WebhookClient>>> = Mutex::new(None);

fn cell() -> &'static RwLock<Settings> {
    SETTINGS.get_or_init(|| RwLock::new(Settings::default()))
}

/// Mutate the process-wide settings.
pub fn configure(f: impl FnOnce(&mut Settings)) {
    let mut settings = cell().write().unwrap_or_else(PoisonError::into_inner);
    f(&mut settings);
}

/// Snapshot of the process-wide settings.
pub fn settings() -> Settings {
    cell().read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Restore the defaults.
pub fn reset() {
    configure(|settings| *settings = Settings::default());
}

/// Alerter over the current settings snapshot.
pub fn alerter() -> Result<Alerter, NotifyError> {
    let settings = settings();
    let client = shared_client(&settings)?;
    Ok(Alerter::with_delivery(settings, client))
}

fn shared_client(settings: &Settings) -> Result<Arc<WebhookClient>, NotifyError> {
    let mut slot = CLIENT.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(client) = slot.as_ref().filter(|client| {
        client.open_timeout() == settings.open_timeout
            && client.read_timeout() == settings.read_timeout
    }) {
        return Ok(Arc::clone(client));
    }

    let client = Arc::new(WebhookClient::from_settings(settings)?);
    *slot = Some(Arc::clone(&client));
    Ok(client)
}

/// Notify through the process-wide settings. Never fails; returns `true` iff
/// an alert was delivered.
pub async fn notify<E>(error: &E, context: &ErrorContext) -> bool
where
    E: std::error::Error + ?Sized,
{
    match alerter() {
        Ok(alerter) => alerter.notify_error(error, context).await,
        Err(e) => {
            tracing::warn!(error = %e, "could not build alerter, skipping notification");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    // Single test: the settings and the client are process-global.
    #[tokio::test]
    async fn configure_snapshot_and_reset() {
        reset();
        assert!(!settings().enabled());

        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(!notify(&err, &ErrorContext::new()).await);

        configure(|s| {
            s.webhook_url = Some("https://hooks.slack.com/test".into());
            s.dedup_ttl = 600;
            s.app_name = Some("TestApp".into());
        });
        let snapshot = settings();
        assert!(snapshot.enabled());
        assert_eq!(snapshot.dedup_ttl, 600);
        assert_eq!(snapshot.app_name.as_deref(), Some("TestApp"));
        assert_eq!(alerter().unwrap().settings().dedup_ttl, 600);

        let first = shared_client(&settings()).unwrap();
        let again = shared_client(&settings()).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        configure(|s| s.read_timeout = Duration::from_secs(2));
        let rebuilt = shared_client(&settings()).unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(rebuilt.read_timeout(), Duration::from_secs(2));

        reset();
        assert!(settings().webhook_url.is_none());
        assert_eq!(settings().dedup_ttl, 300);
    }
}
