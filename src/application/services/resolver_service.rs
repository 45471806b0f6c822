//! Turns an inbound path segment into exactly one short URL record.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::domain::entities::ShortUrl;
use crate::domain::redirect_error::RedirectError;
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, RecordKey};
use crate::utils::alias::{ALIAS_REGEX, normalize_alias};
use crate::utils::key_codec::KeyCodec;

/// Resolves segments by alias first, then by decoded key.
///
/// Aliases are operator-chosen, so a segment that is both a live alias and
/// a decodable key always resolves to the aliased record. Every store call
/// is bounded by `store_timeout`; cache failures are treated as misses.
pub struct ResolverService {
    repository: Arc<dyn ShortUrlRepository>,
    cache: Arc<dyn CacheService>,
    codec: KeyCodec,
    store_timeout: Duration,
}

impl ResolverService {
    pub fn new(
        repository: Arc<dyn ShortUrlRepository>,
        cache: Arc<dyn CacheService>,
        codec: KeyCodec,
        store_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            cache,
            codec,
            store_timeout,
        }
    }

    /// Codec used to derive and decode keys.
    pub fn codec(&self) -> KeyCodec {
        self.codec
    }

    /// Full resolution: alias lookup, then key decode and id lookup.
    ///
    /// # Errors
    ///
    /// - [`RedirectError::InvalidIdentifier`] if the segment is not an alias and does not decode
    /// - [`RedirectError::NotFound`] if no live record matches
    /// - [`RedirectError::StoreUnavailable`] if the store fails or times out
    pub async fn resolve(&self, segment: &str) -> Result<ShortUrl, RedirectError> {
        if let Some(record) = self.lookup_alias(segment).await? {
            debug!(segment, id = record.id, "Resolved by alias");
            return Ok(record);
        }

        let value = self.codec.decode(segment).map_err(|source| {
            warn!(segment, error = %source, "Segment is neither alias nor key");
            RedirectError::InvalidIdentifier {
                segment: segment.to_string(),
                source,
            }
        })?;

        // keys beyond the store's id range decode but can never exist
        let Ok(id) = i64::try_from(value) else {
            return Err(Self::not_found(segment));
        };

        match self.lookup_id(segment, id).await? {
            Some(record) => {
                debug!(segment, id, "Resolved by key");
                Ok(record)
            }
            None => Err(Self::not_found(segment)),
        }
    }

    /// Alias-only resolution used under the alias path prefix.
    ///
    /// # Errors
    ///
    /// Returns [`RedirectError::NotFound`] if no live record has this alias and
    /// [`RedirectError::StoreUnavailable`] if the store fails or times out.
    pub async fn resolve_alias(&self, segment: &str) -> Result<ShortUrl, RedirectError> {
        match self.lookup_alias(segment).await? {
            Some(record) => Ok(record),
            None => Err(Self::not_found(segment)),
        }
    }

    fn not_found(segment: &str) -> RedirectError {
        warn!(segment, "No short URL for segment");
        RedirectError::NotFound {
            segment: segment.to_string(),
        }
    }

    async fn lookup_alias(&self, segment: &str) -> Result<Option<ShortUrl>, RedirectError> {
        let alias = normalize_alias(segment);
        if !ALIAS_REGEX.is_match(&alias) {
            return Ok(None);
        }

        if let Some(record) = self.cached(&RecordKey::Alias(alias.clone())).await {
            return Ok(Some(record));
        }

        let record = self
            .with_timeout(segment, self.repository.get_by_alias(&alias))
            .await?;
        self.remember(record.as_ref()).await;
        Ok(record)
    }

    async fn lookup_id(&self, segment: &str, id: i64) -> Result<Option<ShortUrl>, RedirectError> {
        if let Some(record) = self.cached(&RecordKey::Id(id)).await {
            return Ok(Some(record));
        }

        let record = self
            .with_timeout(segment, self.repository.get_by_id(id))
            .await?;
        self.remember(record.as_ref()).await;
        Ok(record)
    }

    async fn cached(&self, key: &RecordKey) -> Option<ShortUrl> {
        match self.cache.get_record(key).await {
            Ok(record) => record.filter(|r| !r.is_deleted()),
            Err(e) => {
                warn!(error = %e, "Cache lookup failed");
                None
            }
        }
    }

    async fn remember(&self, record: Option<&ShortUrl>) {
        if let Some(record) = record
            && let Err(e) = self.cache.set_record(record, None).await
        {
            warn!(id = record.id, error = %e, "Failed to cache record");
        }
    }

    async fn with_timeout<F>(&self, segment: &str, lookup: F) -> Result<Option<ShortUrl>, RedirectError>
    where
        F: Future<Output = Result<Option<ShortUrl>, AppError>>,
    {
        let unavailable = |reason: String| {
            error!(segment, %reason, "Store unavailable during resolution");
            RedirectError::StoreUnavailable {
                segment: segment.to_string(),
                reason,
            }
        };

        match tokio::time::timeout(self.store_timeout, lookup).await {
            Ok(Ok(record)) => Ok(record),
            Ok(Err(e)) => Err(unavailable(e.to_string())),
            Err(_) => Err(unavailable(format!(
                "no answer within {:?}",
                self.store_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::sample_short_url;
    use crate::domain::repositories::{MockShortUrlRepository, StallingRepository};
    use crate::infrastructure::cache::NullCache;
    use axum::http::StatusCode;
    use serde_json::json;

    fn resolver(repo: impl ShortUrlRepository + 'static) -> ResolverService {
        ResolverService::new(
            Arc::new(repo),
            Arc::new(NullCache::new()),
            KeyCodec::new(false),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn test_resolve_by_key() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_get_by_alias().returning(|_| Ok(None));
        repo.expect_get_by_id()
            .withf(|id| *id == 1234)
            .times(1)
            .returning(|id| Ok(Some(sample_short_url(id))));

        let record = resolver(repo).resolve("16J").await.unwrap();

        assert_eq!(record.id, 1234);
    }

    #[tokio::test]
    async fn test_alias_takes_precedence_over_key() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_get_by_alias()
            .withf(|alias| alias == "promo")
            .times(1)
            .returning(|_| {
                let mut record = sample_short_url(77);
                record.alias = Some("promo".to_string());
                Ok(Some(record))
            });
        repo.expect_get_by_id().times(0);

        let record = resolver(repo).resolve("PROMO").await.unwrap();

        assert_eq!(record.id, 77);
    }

    #[tokio::test]
    async fn test_undecodable_segment_is_invalid_identifier() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_get_by_alias().returning(|_| Ok(None));
        repo.expect_get_by_id().times(0);

        let result = resolver(repo).resolve("u").await;

        assert!(matches!(
            result,
            Err(RedirectError::InvalidIdentifier { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_get_by_alias().returning(|_| Ok(None));
        repo.expect_get_by_id().returning(|_| Ok(None));

        let result = resolver(repo).resolve("zzz-invalid").await;

        assert!(matches!(result, Err(RedirectError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_key_beyond_id_range_is_not_found() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_get_by_alias().returning(|_| Ok(None));
        repo.expect_get_by_id().times(0);

        // 13 symbols: 2^64 - 1 decodes but exceeds i64::MAX
        let key = KeyCodec::new(false).encode(u64::MAX);
        let result = resolver(repo).resolve(&key).await;

        assert!(matches!(result, Err(RedirectError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_store_error_is_unavailable() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_get_by_alias()
            .returning(|_| Err(AppError::unavailable("Database unavailable", json!({}))));

        let result = resolver(repo).resolve("abc").await;

        assert!(matches!(
            result,
            Err(RedirectError::StoreUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_slow_alias_lookup_is_unavailable() {
        let mut inner = MockShortUrlRepository::new();
        inner.expect_get_by_alias().times(1).returning(|_| Ok(None));
        inner.expect_get_by_id().times(0);
        let repo = StallingRepository {
            lookup_delay: Duration::from_secs(1),
            ..StallingRepository::new(inner)
        };

        let err = resolver(repo).resolve("promo").await.unwrap_err();

        assert!(matches!(err, RedirectError::StoreUnavailable { .. }));
        assert_eq!(
            AppError::from(err).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_slow_id_lookup_is_unavailable() {
        let mut inner = MockShortUrlRepository::new();
        inner.expect_get_by_alias().times(0);
        inner.expect_get_by_id().times(1).returning(|_| Ok(None));
        let repo = StallingRepository {
            lookup_delay: Duration::from_secs(1),
            ..StallingRepository::new(inner)
        };

        // 17 symbols is too long for an alias, so only the id lookup runs
        let err = resolver(repo).resolve("00000000000000001").await.unwrap_err();

        assert!(matches!(err, RedirectError::StoreUnavailable { .. }));
        assert_eq!(
            AppError::from(err).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_alias_only_resolution_skips_codec() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_get_by_alias().returning(|_| Ok(None));
        repo.expect_get_by_id().times(0);

        let result = resolver(repo).resolve_alias("16J").await;

        assert!(matches!(result, Err(RedirectError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_overlong_segment_skips_alias_lookup() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_get_by_alias().times(0);
        repo.expect_get_by_id().returning(|_| Ok(None));

        let result = resolver(repo).resolve("1234567890abcdefg").await;

        assert!(result.is_err());
    }
}
