//! Cache service trait and error types.

use async_trait::async_trait;

use crate::domain::entities::ShortUrl;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),
    #[error("Cache operation error: {0}")]
    OperationError(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Lookup key of a cached record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKey {
    Id(i64),
    Alias(String),
}

impl RecordKey {
    /// Namespaced storage key, e.g. `record:id:42` or `record:alias:promo`.
    pub fn storage_key(&self) -> String {
        match self {
            RecordKey::Id(id) => format!("record:id:{id}"),
            RecordKey::Alias(alias) => format!("record:alias:{alias}"),
        }
    }

    /// Every key under which `record` may be cached.
    pub fn all_for(record: &ShortUrl) -> Vec<RecordKey> {
        let mut keys = vec![RecordKey::Id(record.id)];
        if let Some(alias) = &record.alias {
            keys.push(RecordKey::Alias(alias.clone()));
        }
        keys
    }
}

/// Read-through cache of resolved short URL records.
///
/// Implementations must be thread-safe and fail open: a cache failure is
/// logged and treated as a miss so redirects fall back to the store. Hit
/// counters in cached records are stale and must not be read.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with TTL support
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Retrieves a cached record.
    ///
    /// Returns `Ok(None)` on a miss or on backend errors.
    async fn get_record(&self, key: &RecordKey) -> CacheResult<Option<ShortUrl>>;

    /// Caches `record` under its id and, if present, its alias.
    ///
    /// `ttl_seconds` falls back to the implementation default when `None`.
    async fn set_record(&self, record: &ShortUrl, ttl_seconds: Option<u64>) -> CacheResult<()>;

    /// Removes every cached entry of `record`.
    ///
    /// Used when a record is updated or deleted.
    async fn invalidate(&self, record: &ShortUrl) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;
}
