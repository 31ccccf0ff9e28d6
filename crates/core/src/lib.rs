//! Shared building blocks for the error alerter.
//!
//! Holds the [`Settings`] value every pipeline stage reads, the immutable
//! [`ErrorRecord`] each notification is built from, and the [`DedupCache`]
//! collaborator contract used for duplicate suppression.

pub mod cache;
pub mod config;
pub mod error;
pub mod record;

pub use cache::{DedupCache, MemoryCache};
pub use config::{load_dotenv, redact_url, Settings};
pub use error::CacheError;
pub use record::{DeadJob, ErrorContext, ErrorRecord, ErrorRecordBuilder};
