//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, CacheService, RecordKey};
use crate::domain::entities::ShortUrl;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, error, info, warn};

/// Redis cache of resolved records.
///
/// Records are stored as JSON under every [`RecordKey`] that resolves to
/// them. All operations are fail-open: errors are logged but don't
/// propagate to callers.
pub struct RedisCache {
    client: ConnectionManager,
    default_ttl: u64,
}

impl RedisCache {
    /// Connects to Redis, validates the connection with a PING, and configures the default TTL.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING fails.
    pub async fn connect(redis_url: &str, default_ttl_seconds: u64) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis");

        Ok(Self {
            client: manager,
            default_ttl: default_ttl_seconds,
        })
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get_record(&self, key: &RecordKey) -> CacheResult<Option<ShortUrl>> {
        let storage_key = key.storage_key();
        let mut conn = self.client.clone();

        match conn.get::<_, Option<String>>(&storage_key).await {
            Ok(Some(payload)) => match serde_json::from_str::<ShortUrl>(&payload) {
                Ok(record) => {
                    debug!(key = %storage_key, id = record.id, "Cache HIT");
                    Ok(Some(record))
                }
                Err(e) => {
                    warn!(key = %storage_key, error = %e, "Discarding undecodable cache entry");
                    Ok(None)
                }
            },
            Ok(None) => {
                debug!(key = %storage_key, "Cache MISS");
                Ok(None)
            }
            Err(e) => {
                error!(key = %storage_key, error = %e, "Redis GET error");
                Ok(None)
            }
        }
    }

    async fn set_record(&self, record: &ShortUrl, ttl_seconds: Option<u64>) -> CacheResult<()> {
        let payload = serde_json::to_string(record)
            .map_err(|e| CacheError::OperationError(e.to_string()))?;
        let ttl = ttl_seconds.unwrap_or(self.default_ttl);
        let mut conn = self.client.clone();

        for key in RecordKey::all_for(record) {
            let storage_key = key.storage_key();
            match conn.set_ex::<_, _, ()>(&storage_key, &payload, ttl).await {
                Ok(()) => debug!(key = %storage_key, ttl, "Cache SET"),
                Err(e) => warn!(key = %storage_key, error = %e, "Redis SET error"),
            }
        }

        Ok(())
    }

    async fn invalidate(&self, record: &ShortUrl) -> CacheResult<()> {
        let keys: Vec<String> = RecordKey::all_for(record)
            .iter()
            .map(RecordKey::storage_key)
            .collect();
        let mut conn = self.client.clone();

        match conn.del::<_, i32>(&keys).await {
            Ok(deleted) => {
                if deleted > 0 {
                    debug!(id = record.id, deleted, "Cache INVALIDATE");
                }
                Ok(())
            }
            Err(e) => {
                warn!(id = record.id, error = %e, "Redis DEL error");
                Ok(())
            }
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
