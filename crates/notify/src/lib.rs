//! Error alerting pipeline.
//!
//! This crate provides:
//! - `Alerter`, which turns an [`ErrorRecord`] into a deduplicated webhook alert
//! - Payload building in the chat webhook's block format
//! - MD5-fingerprint dedup over a pluggable [`DedupCache`] (Redis behind the `redis` feature)
//! - `WebhookClient` for bounded, never-failing HTTP delivery
//! - Request and dead-job hooks, and a process-wide default instance
//!
//! Nothing here returns an error to the host: alerting may fail silently but
//! never becomes a new source of outages.

pub mod clock;
pub mod dedup;
pub mod global;
pub mod hooks;
pub mod payload;
pub mod pipeline;
#[cfg(feature = "redis")]
pub mod redis_cache;
pub mod traits;
pub mod webhook;

pub use alerter_core::{
    DeadJob, DedupCache, ErrorContext, ErrorRecord, MemoryCache, Settings,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use global::{configure, notify, reset};
pub use payload::{build_payload, AlertPayload};
pub use pipeline::Alerter;
#[cfg(feature = "redis")]
pub use redis_cache::RedisCache;
pub use traits::{Delivery, NotifyError};
pub use webhook::WebhookClient;
