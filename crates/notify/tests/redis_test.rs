//! Redis dedup tests. Need a live server:
//!
//! ```text
//! REDIS_URL=redis://127.0.0.1:6379 cargo test -p alerter-notify -- --ignored
//! ```

#![cfg(feature = "redis")]

use std::sync::Arc;

use alerter_notify::dedup::{dedup_key, is_duplicate};
use alerter_notify::{DedupCache, ErrorRecord, RedisCache, Settings};

async fn cache() -> RedisCache {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
    RedisCache::connect(&url).await.expect("redis reachable")
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn set_if_absent_claims_once() {
    let cache = cache().await;
    let key = format!("error_alerter:test:{}", std::process::id());

    assert!(cache.set_if_absent(&key, "1", 5).await.unwrap());
    assert!(!cache.set_if_absent(&key, "1", 5).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn pipeline_dedup_over_redis() {
    let settings = Settings::default().with_cache(Arc::new(cache().await));
    let record = ErrorRecord::builder("RuntimeError", format!("redis dedup {}", std::process::id()))
        .worker_class("TestWorker")
        .build(500);

    assert!(dedup_key(&record).starts_with("error_alerter:"));
    assert!(!is_duplicate(&record, &settings).await);
    assert!(is_duplicate(&record, &settings).await);
}
