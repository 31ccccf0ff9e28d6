use std::env;
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;

use crate::cache::DedupCache;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

pub const DEFAULT_DEDUP_TTL_SECS: u64 = 300;
pub const DEFAULT_MAX_BACKTRACE_LINES: usize = 5;
pub const DEFAULT_MAX_ERROR_LENGTH: usize = 500;
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(4);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(6);

const ENV_PREFIX: &str = "ERROR_ALERTER";

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_ERROR_ALERTER_{KEY} first,
/// falls back to ERROR_ALERTER_{KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}_{}", profile, ENV_PREFIX, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(&format!("{}_{}", ENV_PREFIX, key))
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Everything the notification pipeline reads.
///
/// A plain value: the pipeline never mutates it and never caches anything
/// derived from it, so swapping in a new `Settings` takes effect on the next
/// notification.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Chat webhook target. Alerting is off while this is blank.
    pub webhook_url: Option<String>,
    /// Dedup window in seconds.
    pub dedup_ttl: u64,
    /// Frames kept in the rendered trace section.
    pub max_backtrace_lines: usize,
    /// Error messages are cut to this many characters at record construction.
    pub max_error_length: usize,
    /// Optional label prefixed to the alert header.
    pub app_name: Option<String>,
    /// Application root marker; only frames containing it are rendered.
    pub app_root: Option<String>,
    /// Zone used for the alert timestamp (UTC when unset).
    pub timezone: Option<Tz>,
    pub open_timeout: Duration,
    pub read_timeout: Duration,
    /// Dedup cache. Absent means every alert is delivered.
    pub cache: Option<Arc<dyn DedupCache>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            dedup_ttl: DEFAULT_DEDUP_TTL_SECS,
            max_backtrace_lines: DEFAULT_MAX_BACKTRACE_LINES,
            max_error_length: DEFAULT_MAX_ERROR_LENGTH,
            app_name: None,
            app_root: None,
            timezone: None,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            cache: None,
        }
    }
}

impl Settings {
    /// Build settings from environment variables (call `load_dotenv()` first).
    /// Profile is read from `ERROR_ALERTER_PROFILE`. When set (e.g. `STAGING`),
    /// every key is first looked up as `{PROFILE}_ERROR_ALERTER_{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_opt("ERROR_ALERTER_PROFILE")
            .unwrap_or_default()
            .to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build settings for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();

        let app_root = profiled_env_opt(p, "APP_ROOT").or_else(|| {
            env::current_dir()
                .ok()
                .map(|dir| dir.to_string_lossy().into_owned())
        });

        let timezone = profiled_env_opt(p, "TIMEZONE").and_then(|name| {
            match name.trim().parse::<Tz>() {
                Ok(tz) => Some(tz),
                Err(_) => {
                    tracing::warn!(timezone = %name, "unknown timezone, falling back to UTC");
                    None
                }
            }
        });

        Self {
            webhook_url: profiled_env_opt(p, "WEBHOOK_URL"),
            dedup_ttl: profiled_env_u64(p, "DEDUP_TTL", DEFAULT_DEDUP_TTL_SECS),
            max_backtrace_lines: profiled_env_usize(
                p,
                "MAX_BACKTRACE_LINES",
                DEFAULT_MAX_BACKTRACE_LINES,
            ),
            max_error_length: profiled_env_usize(p, "MAX_ERROR_LENGTH", DEFAULT_MAX_ERROR_LENGTH),
            app_name: profiled_env_opt(p, "APP_NAME"),
            app_root,
            timezone,
            open_timeout: Duration::from_secs(profiled_env_u64(
                p,
                "OPEN_TIMEOUT_SECS",
                DEFAULT_OPEN_TIMEOUT.as_secs(),
            )),
            read_timeout: Duration::from_secs(profiled_env_u64(
                p,
                "READ_TIMEOUT_SECS",
                DEFAULT_READ_TIMEOUT.as_secs(),
            )),
            cache: None,
        }
    }

    /// Attach a dedup cache.
    pub fn with_cache(mut self, cache: Arc<dyn DedupCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// True iff the webhook target is non-blank.
    pub fn enabled(&self) -> bool {
        self.webhook_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Error alerter settings:");
        tracing::info!(
            "  webhook:     {}",
            self.webhook_url.as_deref().map(redact_url).unwrap_or_else(|| "(none)".into())
        );
        tracing::info!("  enabled:     {}", self.enabled());
        tracing::info!("  dedup:       ttl={}s, cache={}", self.dedup_ttl, self.cache.is_some());
        tracing::info!(
            "  limits:      backtrace_lines={}, error_length={}",
            self.max_backtrace_lines,
            self.max_error_length
        );
        tracing::info!(
            "  app:         name={}, root={}",
            self.app_name.as_deref().unwrap_or("(none)"),
            self.app_root.as_deref().unwrap_or("(none)")
        );
    }

    /// Return a redacted view safe for printing (no webhook secret).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "enabled": self.enabled(),
            "webhook": self.webhook_url.as_deref().map(redact_url),
            "dedup": {
                "ttl_secs": self.dedup_ttl,
                "cache": self.cache.is_some(),
            },
            "limits": {
                "max_backtrace_lines": self.max_backtrace_lines,
                "max_error_length": self.max_error_length,
            },
            "app": {
                "name": self.app_name,
                "root": self.app_root,
                "timezone": self.timezone.map(|tz| tz.name().to_string()),
            },
            "timeouts": {
                "open_ms": self.open_timeout.as_millis() as u64,
                "read_ms": self.read_timeout.as_millis() as u64,
            },
        })
    }
}

/// Reduce a webhook URL to `scheme://host/…` so the token in its path never
/// reaches logs.
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw.trim()) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => format!("{}://{}/…", parsed.scheme(), host),
            None => format!("{}:…", parsed.scheme()),
        },
        Err(_) => "(invalid url)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert!(settings.webhook_url.is_none());
        assert_eq!(settings.dedup_ttl, 300);
        assert_eq!(settings.max_backtrace_lines, 5);
        assert_eq!(settings.max_error_length, 500);
        assert!(settings.app_name.is_none());
        assert!(settings.cache.is_none());
        assert_eq!(settings.open_timeout, Duration::from_secs(4));
        assert_eq!(settings.read_timeout, Duration::from_secs(6));
    }

    #[test]
    fn enabled_when_url_set() {
        let settings = Settings {
            webhook_url: Some("https://hooks.slack.com/test".into()),
            ..Settings::default()
        };
        assert!(settings.enabled());
    }

    #[test]
    fn disabled_when_url_blank_or_missing() {
        for url in [None, Some(""), Some("   "), Some("\t\n")] {
            let settings = Settings {
                webhook_url: url.map(String::from),
                ..Settings::default()
            };
            assert!(!settings.enabled(), "expected disabled for {url:?}");
        }
    }

    #[test]
    fn enabled_tracks_reconfiguration() {
        let mut settings = Settings::default();
        assert!(!settings.enabled());
        settings.webhook_url = Some("https://hooks.slack.com/test".into());
        assert!(settings.enabled());
        settings.webhook_url = None;
        assert!(!settings.enabled());
    }

    #[test]
    fn for_profile_reads_prefixed_keys() {
        env::set_var("QA_ERROR_ALERTER_WEBHOOK_URL", "https://hooks.slack.com/qa");
        env::set_var("ERROR_ALERTER_DEDUP_TTL", "600");
        env::set_var("QA_ERROR_ALERTER_APP_NAME", "TestApp");
        env::set_var("QA_ERROR_ALERTER_TIMEZONE", "America/New_York");

        let settings = Settings::for_profile("qa");
        assert_eq!(settings.webhook_url.as_deref(), Some("https://hooks.slack.com/qa"));
        assert_eq!(settings.dedup_ttl, 600);
        assert_eq!(settings.app_name.as_deref(), Some("TestApp"));
        assert_eq!(settings.timezone, Some(chrono_tz::America::New_York));
        assert!(settings.app_root.is_some());

        env::remove_var("QA_ERROR_ALERTER_WEBHOOK_URL");
        env::remove_var("ERROR_ALERTER_DEDUP_TTL");
        env::remove_var("QA_ERROR_ALERTER_APP_NAME");
        env::remove_var("QA_ERROR_ALERTER_TIMEZONE");
    }

    #[test]
    fn unparseable_values_fall_back() {
        env::set_var("BAD_ERROR_ALERTER_MAX_ERROR_LENGTH", "lots");
        env::set_var("BAD_ERROR_ALERTER_TIMEZONE", "Mars/Olympus_Mons");

        let settings = Settings::for_profile("bad");
        assert_eq!(settings.max_error_length, DEFAULT_MAX_ERROR_LENGTH);
        assert!(settings.timezone.is_none());

        env::remove_var("BAD_ERROR_ALERTER_MAX_ERROR_LENGTH");
        env::remove_var("BAD_ERROR_ALERTER_TIMEZONE");
    }

    #[test]
    fn redacted_summary_hides_webhook_path() {
        let settings = Settings {
            webhook_url: Some("https://hooks.slack.com/services/T000/B000/secret".into()),
            ..Settings::default()
        };
        let summary = settings.redacted_summary();
        assert_eq!(summary["enabled"], true);
        assert_eq!(summary["webhook"], "https://hooks.slack.com/…");
        assert!(!summary.to_string().contains("secret"));
    }

    #[test]
    fn redact_url_rejects_garbage() {
        assert_eq!(redact_url("not a url"), "(invalid url)");
    }
}
