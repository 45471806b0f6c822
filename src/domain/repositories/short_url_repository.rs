//! Repository trait for short URL records.

use std::collections::BTreeSet;

use crate::domain::entities::{NewShortUrl, RecordField, ShortUrl, ShortUrlPatch};
use crate::error::AppError;
use async_trait::async_trait;

/// Storage interface for short URL records.
///
/// The redirect path only uses [`get_by_id`](Self::get_by_id),
/// [`get_by_alias`](Self::get_by_alias) and
/// [`increment_hits`](Self::increment_hits). The remaining methods serve the
/// administrative tooling.
///
/// Soft-deleted records are invisible to every lookup, and their ids and
/// aliases are never handed out again.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgShortUrlRepository`] - PostgreSQL
/// - [`crate::infrastructure::persistence::InMemoryShortUrlRepository`] - in-process map
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortUrlRepository: Send + Sync {
    /// Creates a record and assigns its id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the alias is already taken.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn create(&self, new_short_url: NewShortUrl) -> Result<ShortUrl, AppError>;

    /// Finds a live record by id.
    async fn get_by_id(&self, id: i64) -> Result<Option<ShortUrl>, AppError>;

    /// Finds a live record by alias.
    ///
    /// `alias` must already be normalized (lowercase).
    async fn get_by_alias(&self, alias: &str) -> Result<Option<ShortUrl>, AppError>;

    /// Adds one hit and stamps `last_used` in a single atomic operation.
    ///
    /// Concurrent increments for the same id are never lost. Incrementing a
    /// missing or deleted record is a no-op.
    async fn increment_hits(&self, id: i64) -> Result<(), AppError>;

    /// Distinct non-empty values of a label column, for suggestions.
    async fn list_distinct_values(&self, field: RecordField) -> Result<BTreeSet<String>, AppError>;

    /// Partially updates a live record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no live record has this id.
    /// Returns [`AppError::Conflict`] if the new alias is taken.
    async fn update(&self, id: i64, patch: ShortUrlPatch) -> Result<ShortUrl, AppError>;

    /// Soft-deletes a record.
    ///
    /// Returns `Ok(false)` if the record was not found or already deleted.
    async fn soft_delete(&self, id: i64) -> Result<bool, AppError>;

    /// Lists live records, most recently used first.
    ///
    /// `page` is 1-indexed.
    async fn list(&self, page: i64, page_size: i64) -> Result<Vec<ShortUrl>, AppError>;

    /// Counts live records.
    async fn count(&self) -> Result<i64, AppError>;

    /// Checks that the backing store answers.
    async fn health_check(&self) -> bool;
}

/// Wraps a mock and sleeps after it answers, so callers hit their timeouts.
#[cfg(test)]
pub struct StallingRepository {
    pub inner: MockShortUrlRepository,
    pub lookup_delay: std::time::Duration,
    pub increment_delay: std::time::Duration,
}

#[cfg(test)]
impl StallingRepository {
    pub fn new(inner: MockShortUrlRepository) -> Self {
        Self {
            inner,
            lookup_delay: std::time::Duration::ZERO,
            increment_delay: std::time::Duration::ZERO,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ShortUrlRepository for StallingRepository {
    async fn create(&self, new_short_url: NewShortUrl) -> Result<ShortUrl, AppError> {
        self.inner.create(new_short_url).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ShortUrl>, AppError> {
        let result = self.inner.get_by_id(id).await;
        tokio::time::sleep(self.lookup_delay).await;
        result
    }

    async fn get_by_alias(&self, alias: &str) -> Result<Option<ShortUrl>, AppError> {
        let result = self.inner.get_by_alias(alias).await;
        tokio::time::sleep(self.lookup_delay).await;
        result
    }

    async fn increment_hits(&self, id: i64) -> Result<(), AppError> {
        let result = self.inner.increment_hits(id).await;
        tokio::time::sleep(self.increment_delay).await;
        result
    }

    async fn list_distinct_values(&self, field: RecordField) -> Result<BTreeSet<String>, AppError> {
        self.inner.list_distinct_values(field).await
    }

    async fn update(&self, id: i64, patch: ShortUrlPatch) -> Result<ShortUrl, AppError> {
        self.inner.update(id, patch).await
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, AppError> {
        self.inner.soft_delete(id).await
    }

    async fn list(&self, page: i64, page_size: i64) -> Result<Vec<ShortUrl>, AppError> {
        self.inner.list(page, page_size).await
    }

    async fn count(&self) -> Result<i64, AppError> {
        self.inner.count().await
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }
}
