//! Wall-clock source for alert timestamps.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// e.g. `Mar 04, 2025 3:07 PM`
const TIMESTAMP_FORMAT: &str = "%b %d, %Y %-I:%M %p";

/// Produces the already-formatted timestamp rendered into alerts.
pub trait Clock: Send + Sync {
    fn timestamp(&self) -> String;
}

/// Current time in UTC, or in the given zone with its abbreviation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    timezone: Option<Tz>,
}

impl SystemClock {
    pub fn new(timezone: Option<Tz>) -> Self {
        Self { timezone }
    }
}

impl Clock for SystemClock {
    fn timestamp(&self) -> String {
        format_timestamp(Utc::now(), self.timezone)
    }
}

/// Always returns the same string.
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn timestamp(&self) -> String {
        self.0.clone()
    }
}

/// Render `at` as `"%b %d, %Y %-I:%M %p <ZONE>"`.
pub fn format_timestamp(at: DateTime<Utc>, timezone: Option<Tz>) -> String {
    match timezone {
        Some(tz) => {
            let local = tz.from_utc_datetime(&at.naive_utc());
            format!("{} {}", local.format(TIMESTAMP_FORMAT), local.format("%Z"))
        }
        None => format!("{} UTC", at.format(TIMESTAMP_FORMAT)),
    }
}
