//! Administrative operations on short URL records.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};
use validator::Validate;

use crate::domain::entities::{NewShortUrl, RecordField, ShortUrl, ShortUrlPatch};
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::utils::alias::{normalize_alias, validate_alias};
use crate::utils::key_codec::KeyCodec;
use crate::utils::url_validator::validate_destination_url;

/// How short URLs are rendered for operators.
#[derive(Debug, Clone)]
pub struct ShortUrlSettings {
    pub base_url: String,
    pub alias_prefix: Option<String>,
    pub codec: KeyCodec,
}

/// Entity editor for short URL records.
///
/// Validates and normalizes input before it reaches the store, refuses
/// aliases that would shadow another record's key, and drops cached copies
/// of a record whenever it changes.
pub struct ShortUrlService {
    repository: Arc<dyn ShortUrlRepository>,
    cache: Arc<dyn CacheService>,
    settings: ShortUrlSettings,
}

impl ShortUrlService {
    pub fn new(
        repository: Arc<dyn ShortUrlRepository>,
        cache: Arc<dyn CacheService>,
        settings: ShortUrlSettings,
    ) -> Self {
        Self {
            repository,
            cache,
            settings,
        }
    }

    /// Creates a record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for an invalid destination, alias or
    /// label, and [`AppError::Conflict`] if the alias is taken or equals the
    /// key of another record.
    pub async fn create(&self, input: NewShortUrl) -> Result<ShortUrl, AppError> {
        let mut input = NewShortUrl {
            campaign: clean_label(input.campaign),
            medium: clean_label(input.medium),
            content: clean_label(input.content),
            description: clean_label(input.description),
            creator: clean_label(input.creator),
            ..input
        };
        input.validate()?;

        input.long_url = self.validated_destination(&input.long_url)?;
        if let Some(alias) = input.alias.take().filter(|a| !a.trim().is_empty()) {
            input.alias = Some(self.checked_alias(&alias, None).await?);
        }

        let record = self.repository.create(input).await?;
        info!(id = record.id, key = %self.key_for(&record), "Short URL created");

        Ok(record)
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`], plus [`AppError::NotFound`] if the record
    /// does not exist.
    pub async fn update(&self, id: i64, patch: ShortUrlPatch) -> Result<ShortUrl, AppError> {
        let mut patch = ShortUrlPatch {
            campaign: patch.campaign.map(clean_label),
            medium: patch.medium.map(clean_label),
            content: patch.content.map(clean_label),
            description: patch.description.map(clean_label),
            ..patch
        };
        patch.validate()?;

        if patch.is_empty() {
            return Err(AppError::bad_request("Nothing to update", json!({ "id": id })));
        }

        let current = self.get(id).await?;

        if let Some(long_url) = patch.long_url.take() {
            patch.long_url = Some(self.validated_destination(&long_url)?);
        }
        if let Some(alias) = patch.alias.take() {
            patch.alias = Some(match clean_label(alias) {
                Some(alias) => Some(self.checked_alias(&alias, Some(id)).await?),
                None => None,
            });
        }

        let updated = self.repository.update(id, patch).await?;
        self.forget(&current).await;
        info!(id, "Short URL updated");

        Ok(updated)
    }

    /// Soft-deletes a record. Its id and alias stay reserved.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the record does not exist.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let current = self.get(id).await?;

        if !self.repository.soft_delete(id).await? {
            return Err(AppError::not_found("Short URL not found", json!({ "id": id })));
        }
        self.forget(&current).await;
        info!(id, "Short URL deleted");

        Ok(())
    }

    /// Fetches a live record by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no live record has this id.
    pub async fn get(&self, id: i64) -> Result<ShortUrl, AppError> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Short URL not found", json!({ "id": id })))
    }

    /// Finds a record by alias or key, alias first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if neither matches a live record.
    pub async fn find(&self, key_or_alias: &str) -> Result<ShortUrl, AppError> {
        if let Some(record) = self
            .repository
            .get_by_alias(&normalize_alias(key_or_alias))
            .await?
        {
            return Ok(record);
        }

        let not_found =
            || AppError::not_found("Short URL not found", json!({ "segment": key_or_alias }));

        let id = self
            .settings
            .codec
            .decode(key_or_alias)
            .ok()
            .and_then(|value| i64::try_from(value).ok())
            .ok_or_else(not_found)?;

        self.repository.get_by_id(id).await?.ok_or_else(not_found)
    }

    /// One page of live records plus the total count.
    pub async fn list(&self, page: i64, page_size: i64) -> Result<(Vec<ShortUrl>, i64), AppError> {
        if page < 1 || !(1..=1000).contains(&page_size) {
            return Err(AppError::bad_request(
                "Page must be >= 1 and page size 1-1000",
                json!({ "page": page, "page_size": page_size }),
            ));
        }

        let records = self.repository.list(page, page_size).await?;
        let total = self.repository.count().await?;
        Ok((records, total))
    }

    /// Distinct values of a label column, for suggestions.
    pub async fn suggestions(&self, field: RecordField) -> Result<BTreeSet<String>, AppError> {
        self.repository.list_distinct_values(field).await
    }

    /// The record's key.
    pub fn key_for(&self, record: &ShortUrl) -> String {
        self.settings.codec.encode(record.key_value())
    }

    /// Full short URL of a record.
    ///
    /// With `prefer_alias` and an alias present, renders the alias form,
    /// under the alias path prefix when one is configured.
    pub fn short_url(&self, record: &ShortUrl, prefer_alias: bool) -> String {
        let base = self.settings.base_url.trim_end_matches('/');

        match (&record.alias, prefer_alias, &self.settings.alias_prefix) {
            (Some(alias), true, Some(prefix)) => format!("{base}/{prefix}/{alias}"),
            (Some(alias), true, None) => format!("{base}/{alias}"),
            _ => format!("{base}/{}", self.key_for(record)),
        }
    }

    fn validated_destination(&self, long_url: &str) -> Result<String, AppError> {
        validate_destination_url(long_url).map_err(|e| {
            AppError::bad_request(e.to_string(), json!({ "url": long_url }))
        })
    }

    /// Validates an alias and checks it against existing keys and aliases.
    ///
    /// `owner` is the record being edited, which may keep its own alias.
    async fn checked_alias(&self, input: &str, owner: Option<i64>) -> Result<String, AppError> {
        let alias = validate_alias(input, self.settings.alias_prefix.as_deref())?;

        if let Some(existing) = self.repository.get_by_alias(&alias).await?
            && Some(existing.id) != owner
        {
            return Err(AppError::conflict(
                "Alias already in use",
                json!({ "alias": alias, "id": existing.id }),
            ));
        }

        // an alias spelling another record's key would make that key unreachable
        if let Some(shadowed) = self
            .settings
            .codec
            .decode(&alias)
            .ok()
            .and_then(|value| i64::try_from(value).ok())
            && Some(shadowed) != owner
            && self.repository.get_by_id(shadowed).await?.is_some()
        {
            return Err(AppError::conflict(
                "Alias collides with the key of another short URL",
                json!({ "alias": alias, "id": shadowed }),
            ));
        }

        Ok(alias)
    }

    async fn forget(&self, record: &ShortUrl) {
        if let Err(e) = self.cache.invalidate(record).await {
            warn!(id = record.id, error = %e, "Failed to invalidate cached record");
        }
    }
}

/// Trims a label; blank labels become `None`.
fn clean_label(label: Option<String>) -> Option<String> {
    label
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::sample_short_url;
    use crate::domain::repositories::MockShortUrlRepository;
    use crate::infrastructure::cache::NullCache;

    fn service(repo: MockShortUrlRepository, alias_prefix: Option<&str>) -> ShortUrlService {
        ShortUrlService::new(
            Arc::new(repo),
            Arc::new(NullCache::new()),
            ShortUrlSettings {
                base_url: "https://s.example.com/".to_string(),
                alias_prefix: alias_prefix.map(str::to_string),
                codec: KeyCodec::new(false),
            },
        )
    }

    fn echo_create(repo: &mut MockShortUrlRepository) {
        repo.expect_create().returning(|input| {
            let mut record = sample_short_url(10);
            record.long_url = input.long_url;
            record.alias = input.alias;
            record.campaign = input.campaign;
            record.medium = input.medium;
            record.content = input.content;
            Ok(record)
        });
    }

    #[tokio::test]
    async fn test_create_normalizes_input() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_get_by_alias().returning(|_| Ok(None));
        repo.expect_get_by_id().returning(|_| Ok(None));
        echo_create(&mut repo);

        let record = service(repo, None)
            .create(NewShortUrl {
                long_url: " https://EXAMPLE.com/landing ".to_string(),
                alias: Some("Spring-Sale".to_string()),
                campaign: Some("  Spring ".to_string()),
                medium: Some("   ".to_string()),
                is_tracking: true,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(record.long_url, "https://example.com/landing");
        assert_eq!(record.alias.as_deref(), Some("spring-sale"));
        assert_eq!(record.campaign.as_deref(), Some("Spring"));
        assert!(record.medium.is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_destination() {
        let repo = MockShortUrlRepository::new();

        let result = service(repo, None)
            .create(NewShortUrl {
                long_url: "javascript:alert(1)".to_string(),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_create_rejects_long_label() {
        let repo = MockShortUrlRepository::new();

        let result = service(repo, None)
            .create(NewShortUrl {
                long_url: "https://example.com".to_string(),
                content: Some("x".repeat(65)),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_alias_shadowing_other_key_conflicts() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_get_by_alias().returning(|_| Ok(None));
        // "2" decodes to id 2, which exists
        repo.expect_get_by_id()
            .withf(|id| *id == 2)
            .returning(|id| Ok(Some(sample_short_url(id))));
        repo.expect_create().times(0);

        let result = service(repo, None)
            .create(NewShortUrl {
                long_url: "https://example.com".to_string(),
                alias: Some("2".to_string()),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_taken_alias_conflicts() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_get_by_alias()
            .returning(|_| Ok(Some(sample_short_url(3))));
        repo.expect_create().times(0);

        let result = service(repo, None)
            .create(NewShortUrl {
                long_url: "https://example.com".to_string(),
                alias: Some("promo".to_string()),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_keeps_own_alias() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_get_by_id().returning(|id| {
            if id != 5 {
                return Ok(None);
            }
            let mut record = sample_short_url(id);
            record.alias = Some("promo".to_string());
            Ok(Some(record))
        });
        repo.expect_get_by_alias().returning(|_| {
            let mut record = sample_short_url(5);
            record.alias = Some("promo".to_string());
            Ok(Some(record))
        });
        repo.expect_update()
            .withf(|id, patch| *id == 5 && patch.alias == Some(Some("promo".to_string())))
            .times(1)
            .returning(|id, _| Ok(sample_short_url(id)));

        let patch = ShortUrlPatch {
            alias: Some(Some("PROMO".to_string())),
            ..Default::default()
        };
        let result = service(repo, None).update(5, patch).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_empty_update_is_rejected() {
        let repo = MockShortUrlRepository::new();

        let result = service(repo, None).update(1, ShortUrlPatch::default()).await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_delete_missing_record() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_get_by_id().returning(|_| Ok(None));
        repo.expect_soft_delete().times(0);

        let result = service(repo, None).delete(9).await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_find_by_key() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_get_by_alias().returning(|_| Ok(None));
        repo.expect_get_by_id()
            .withf(|id| *id == 1234)
            .returning(|id| Ok(Some(sample_short_url(id))));

        let record = service(repo, None).find("16j").await.unwrap();

        assert_eq!(record.id, 1234);
    }

    #[test]
    fn test_short_url_rendering() {
        let mut record = sample_short_url(1234);
        let plain = service(MockShortUrlRepository::new(), None);
        let prefixed = service(MockShortUrlRepository::new(), Some("go"));

        assert_eq!(plain.short_url(&record, true), "https://s.example.com/16J");

        record.alias = Some("promo".to_string());
        assert_eq!(plain.short_url(&record, false), "https://s.example.com/16J");
        assert_eq!(plain.short_url(&record, true), "https://s.example.com/promo");
        assert_eq!(
            prefixed.short_url(&record, true),
            "https://s.example.com/go/promo"
        );
    }

    #[tokio::test]
    async fn test_list_rejects_bad_paging() {
        let repo = MockShortUrlRepository::new();
        let service = service(repo, None);

        assert!(service.list(0, 10).await.is_err());
        assert!(service.list(1, 0).await.is_err());
    }
}
