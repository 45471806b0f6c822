//! No-op cache implementation for testing or disabled caching.

use super::service::{CacheResult, CacheService, RecordKey};
use crate::domain::entities::ShortUrl;
use async_trait::async_trait;
use tracing::debug;

/// A cache implementation that does nothing.
///
/// Used when Redis is not configured or unreachable at startup, and by
/// tests that resolve straight against the store.
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheService for NullCache {
    async fn get_record(&self, _key: &RecordKey) -> CacheResult<Option<ShortUrl>> {
        Ok(None)
    }

    async fn set_record(&self, _record: &ShortUrl, _ttl_seconds: Option<u64>) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _record: &ShortUrl) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
