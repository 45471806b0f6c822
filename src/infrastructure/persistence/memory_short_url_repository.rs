//! In-memory implementation of the short URL repository.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::domain::entities::{NewShortUrl, RecordField, ShortUrl, ShortUrlPatch};
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;

/// DashMap-backed repository used by integration tests and local runs.
///
/// Mirrors the PostgreSQL semantics: ids are never reused, aliases stay
/// reserved after a soft delete, and increments happen under the entry's
/// shard lock so concurrent hits are never lost.
#[derive(Debug)]
pub struct InMemoryShortUrlRepository {
    records: DashMap<i64, ShortUrl>,
    aliases: DashMap<String, i64>,
    next_id: AtomicI64,
}

impl InMemoryShortUrlRepository {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            aliases: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    fn alias_conflict(alias: &str) -> AppError {
        AppError::conflict(
            "Unique constraint violation",
            json!({ "constraint": "short_urls_alias_key", "alias": alias }),
        )
    }

    /// Claims `alias` for `id`. Succeeds if the alias is free or already owned by `id`.
    fn reserve_alias(&self, alias: &str, id: i64) -> Result<(), AppError> {
        match self.aliases.entry(alias.to_string()) {
            Entry::Occupied(owner) if *owner.get() != id => Err(Self::alias_conflict(alias)),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(id);
                Ok(())
            }
        }
    }
}

impl Default for InMemoryShortUrlRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShortUrlRepository for InMemoryShortUrlRepository {
    async fn create(&self, new_short_url: NewShortUrl) -> Result<ShortUrl, AppError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        if let Some(alias) = new_short_url.alias.as_deref() {
            self.reserve_alias(alias, id)?;
        }

        let record = ShortUrl {
            id,
            long_url: new_short_url.long_url,
            alias: new_short_url.alias,
            campaign: new_short_url.campaign,
            medium: new_short_url.medium,
            content: new_short_url.content,
            description: new_short_url.description,
            creator: new_short_url.creator,
            is_tracking: new_short_url.is_tracking,
            hits: 0,
            last_used: None,
            created: Utc::now(),
            deleted_at: None,
        };
        self.records.insert(id, record.clone());

        Ok(record)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ShortUrl>, AppError> {
        Ok(self
            .records
            .get(&id)
            .filter(|record| !record.is_deleted())
            .map(|record| record.clone()))
    }

    async fn get_by_alias(&self, alias: &str) -> Result<Option<ShortUrl>, AppError> {
        let Some(id) = self.aliases.get(alias).map(|owner| *owner) else {
            return Ok(None);
        };
        self.get_by_id(id).await
    }

    async fn increment_hits(&self, id: i64) -> Result<(), AppError> {
        if let Some(mut record) = self.records.get_mut(&id)
            && !record.is_deleted()
        {
            record.hits += 1;
            record.last_used = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_distinct_values(&self, field: RecordField) -> Result<BTreeSet<String>, AppError> {
        Ok(self
            .records
            .iter()
            .filter(|record| !record.is_deleted())
            .filter_map(|record| field.value_of(&record).map(str::to_string))
            .filter(|value| !value.is_empty())
            .collect())
    }

    async fn update(&self, id: i64, patch: ShortUrlPatch) -> Result<ShortUrl, AppError> {
        let not_found = || AppError::not_found("Short URL not found", json!({ "id": id }));

        let current_alias = match self.records.get(&id) {
            Some(record) if !record.is_deleted() => record.alias.clone(),
            _ => return Err(not_found()),
        };

        if let Some(new_alias) = &patch.alias {
            if let Some(alias) = new_alias.as_deref() {
                self.reserve_alias(alias, id)?;
            }
            if let Some(old) = current_alias.as_deref()
                && new_alias.as_deref() != Some(old)
            {
                self.aliases.remove(old);
            }
        }

        let mut record = self.records.get_mut(&id).ok_or_else(not_found)?;
        patch.apply_to(&mut record);
        Ok(record.clone())
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, AppError> {
        match self.records.get_mut(&id) {
            Some(mut record) if !record.is_deleted() => {
                record.deleted_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(&self, page: i64, page_size: i64) -> Result<Vec<ShortUrl>, AppError> {
        let mut records: Vec<ShortUrl> = self
            .records
            .iter()
            .filter(|record| !record.is_deleted())
            .map(|record| record.clone())
            .collect();

        // most recently used first, never-used last
        records.sort_by(|a, b| {
            b.last_used
                .cmp(&a.last_used)
                .then_with(|| b.id.cmp(&a.id))
        });

        let offset = ((page.max(1) - 1) * page_size).max(0) as usize;
        Ok(records
            .into_iter()
            .skip(offset)
            .take(page_size.max(0) as usize)
            .collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self
            .records
            .iter()
            .filter(|record| !record.is_deleted())
            .count() as i64)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_record(long_url: &str, alias: Option<&str>) -> NewShortUrl {
        NewShortUrl {
            long_url: long_url.to_string(),
            alias: alias.map(str::to_string),
            is_tracking: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let repo = InMemoryShortUrlRepository::new();
        let first = repo.create(new_record("https://a.example/", None)).await.unwrap();
        let second = repo.create(new_record("https://b.example/", None)).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.hits, 0);
    }

    #[tokio::test]
    async fn test_duplicate_alias_conflicts() {
        let repo = InMemoryShortUrlRepository::new();
        repo.create(new_record("https://a.example/", Some("promo")))
            .await
            .unwrap();

        let result = repo
            .create(new_record("https://b.example/", Some("promo")))
            .await;

        assert!(matches!(result, Err(AppError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_record_but_keeps_alias() {
        let repo = InMemoryShortUrlRepository::new();
        let record = repo
            .create(new_record("https://a.example/", Some("promo")))
            .await
            .unwrap();

        assert!(repo.soft_delete(record.id).await.unwrap());
        assert!(!repo.soft_delete(record.id).await.unwrap());
        assert!(repo.get_by_id(record.id).await.unwrap().is_none());
        assert!(repo.get_by_alias("promo").await.unwrap().is_none());

        let reuse = repo
            .create(new_record("https://b.example/", Some("promo")))
            .await;
        assert!(matches!(reuse, Err(AppError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let repo = Arc::new(InMemoryShortUrlRepository::new());
        let record = repo.create(new_record("https://a.example/", None)).await.unwrap();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.increment_hits(record.id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = repo.get_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(stored.hits, 50);
        assert!(stored.last_used.is_some());
    }

    #[tokio::test]
    async fn test_update_moves_alias() {
        let repo = InMemoryShortUrlRepository::new();
        let record = repo
            .create(new_record("https://a.example/", Some("old")))
            .await
            .unwrap();

        let patch = ShortUrlPatch {
            alias: Some(Some("new".to_string())),
            ..Default::default()
        };
        let updated = repo.update(record.id, patch).await.unwrap();

        assert_eq!(updated.alias.as_deref(), Some("new"));
        assert!(repo.get_by_alias("old").await.unwrap().is_none());
        assert_eq!(repo.get_by_alias("new").await.unwrap().unwrap().id, record.id);
    }

    #[tokio::test]
    async fn test_distinct_values_skip_empty() {
        let repo = InMemoryShortUrlRepository::new();
        for campaign in ["Spring", "Autumn", "Spring", ""] {
            repo.create(NewShortUrl {
                long_url: "https://a.example/".to_string(),
                campaign: Some(campaign.to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        }

        let values = repo
            .list_distinct_values(RecordField::Campaign)
            .await
            .unwrap();
        assert_eq!(
            values.into_iter().collect::<Vec<_>>(),
            vec!["Autumn".to_string(), "Spring".to_string()]
        );
    }
}
