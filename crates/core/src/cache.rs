//! Dedup cache collaborator.
//!
//! The pipeline needs exactly one primitive from its cache: "set this key
//! unless it already exists, expiring after N seconds", answered atomically.
//! Redis provides it as `SET key value NX EX ttl`; [`MemoryCache`] provides it
//! in-process.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::CacheError;

/// Atomic claim-or-detect store used for duplicate suppression.
#[async_trait]
pub trait DedupCache: Send + Sync + std::fmt::Debug {
    /// Set `key` to `value` only if it is absent, expiring after `ttl_secs`.
    ///
    /// Returns `true` when the key was newly set, `false` when it already
    /// existed. Must be a single atomic operation.
    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: u64)
        -> Result<bool, CacheError>;
}

/// In-process [`DedupCache`] with per-key expiry.
///
/// Only dedups within one process; use a shared cache when several
/// processes report errors.
#[derive(Debug, Default)]
pub struct MemoryCache {
    /// Key → expiry instant.
    entries: Mutex<HashMap<String, Instant>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .map(|entries| entries.values().filter(|expiry| **expiry > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DedupCache for MemoryCache {
    async fn set_if_absent(
        &self,
        key: &str,
        _value: &str,
        ttl_secs: u64,
    ) -> Result<bool, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.retain(|_, expiry| *expiry > now);

        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), now + Duration::from_secs(ttl_secs));
        Ok(true)
    }
}
