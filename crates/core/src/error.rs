use thiserror::Error;

/// Failures reported by a [`DedupCache`](crate::DedupCache) implementation.
///
/// Callers treat every variant the same way (dedup fails open), the split
/// only exists so log lines say what went wrong.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),

    #[error("cache command failed: {0}")]
    Command(String),

    #[error("unexpected cache reply: {0}")]
    UnexpectedReply(String),

    #[error("cache state poisoned")]
    Poisoned,
}
