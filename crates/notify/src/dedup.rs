//! Duplicate suppression.
//!
//! An error's identity is the MD5 of `"{error_class}:{source_detail}:{error_message}"`.
//! The first occurrence claims `error_alerter:{fingerprint}` in the cache for
//! the dedup window; later occurrences find the key taken and are suppressed.
//! Messages with embedded ids or timestamps produce distinct fingerprints.

use alerter_core::{ErrorRecord, Settings};
use md5::{Digest, Md5};

pub const KEY_PREFIX: &str = "error_alerter";

/// Hex MD5 over the record's identifying fields.
pub fn fingerprint(record: &ErrorRecord) -> String {
    let mut hasher = Md5::new();
    hasher.update(
        format!(
            "{}:{}:{}",
            record.error_class(),
            record.source_detail().unwrap_or_default(),
            record.error_message()
        )
        .as_bytes(),
    );
    hex::encode(hasher.finalize())
}

/// Cache key for `record`.
pub fn dedup_key(record: &ErrorRecord) -> String {
    format!("{KEY_PREFIX}:{}", fingerprint(record))
}

/// Claim the record's key; `true` when an identical error already claimed it
/// inside the dedup window.
///
/// Without a cache nothing is a duplicate. Cache failures fail open.
pub async fn is_duplicate(record: &ErrorRecord, settings: &Settings) -> bool {
    let Some(cache) = settings.cache.as_ref() else {
        return false;
    };

    let key = dedup_key(record);
    // Redis rejects `EX 0`.
    let ttl = settings.dedup_ttl.max(1);

    match cache.set_if_absent(&key, "1", ttl).await {
        Ok(newly_set) => !newly_set,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "dedup check failed, proceeding");
            false
        }
    }
}
