//! PostgreSQL implementation of the short URL repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::entities::{NewShortUrl, RecordField, ShortUrl, ShortUrlPatch};
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;
use serde_json::json;

/// PostgreSQL repository for short URL records.
///
/// Ids come from a `BIGSERIAL` sequence, so they are never reused. Hit
/// accounting is a single `UPDATE ... SET hits = hits + 1` statement, which
/// PostgreSQL serializes per row.
pub struct PgShortUrlRepository {
    pool: Arc<PgPool>,
}

impl PgShortUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShortUrlRepository for PgShortUrlRepository {
    async fn create(&self, new_short_url: NewShortUrl) -> Result<ShortUrl, AppError> {
        let record = sqlx::query_as::<_, ShortUrl>(
            r#"
            INSERT INTO short_urls
                (long_url, alias, campaign, medium, content, description, creator, is_tracking)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, long_url, alias, campaign, medium, content, description, creator,
                      is_tracking, hits, last_used, created, deleted_at
            "#,
        )
        .bind(new_short_url.long_url)
        .bind(new_short_url.alias)
        .bind(new_short_url.campaign)
        .bind(new_short_url.medium)
        .bind(new_short_url.content)
        .bind(new_short_url.description)
        .bind(new_short_url.creator)
        .bind(new_short_url.is_tracking)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(record)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ShortUrl>, AppError> {
        let record = sqlx::query_as::<_, ShortUrl>(
            r#"
            SELECT id, long_url, alias, campaign, medium, content, description, creator,
                   is_tracking, hits, last_used, created, deleted_at
            FROM short_urls
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(record)
    }

    async fn get_by_alias(&self, alias: &str) -> Result<Option<ShortUrl>, AppError> {
        let record = sqlx::query_as::<_, ShortUrl>(
            r#"
            SELECT id, long_url, alias, campaign, medium, content, description, creator,
                   is_tracking, hits, last_used, created, deleted_at
            FROM short_urls
            WHERE alias = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(alias)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(record)
    }

    async fn increment_hits(&self, id: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE short_urls
            SET hits = hits + 1, last_used = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn list_distinct_values(&self, field: RecordField) -> Result<BTreeSet<String>, AppError> {
        // column names come from a closed enum, never from input
        let sql = format!(
            "SELECT DISTINCT {column} FROM short_urls \
             WHERE {column} IS NOT NULL AND {column} <> '' AND deleted_at IS NULL",
            column = field.column()
        );

        let values: Vec<String> = sqlx::query_scalar(&sql)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(values.into_iter().collect())
    }

    async fn update(&self, id: i64, patch: ShortUrlPatch) -> Result<ShortUrl, AppError> {
        let record = sqlx::query_as::<_, ShortUrl>(
            r#"
            UPDATE short_urls SET
                long_url    = COALESCE($2, long_url),
                alias       = CASE WHEN $3 THEN $4 ELSE alias END,
                campaign    = CASE WHEN $5 THEN $6 ELSE campaign END,
                medium      = CASE WHEN $7 THEN $8 ELSE medium END,
                content     = CASE WHEN $9 THEN $10 ELSE content END,
                description = CASE WHEN $11 THEN $12 ELSE description END,
                is_tracking = COALESCE($13, is_tracking)
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, long_url, alias, campaign, medium, content, description, creator,
                      is_tracking, hits, last_used, created, deleted_at
            "#,
        )
        .bind(id)
        .bind(patch.long_url)
        .bind(patch.alias.is_some())
        .bind(patch.alias.flatten())
        .bind(patch.campaign.is_some())
        .bind(patch.campaign.flatten())
        .bind(patch.medium.is_some())
        .bind(patch.medium.flatten())
        .bind(patch.content.is_some())
        .bind(patch.content.flatten())
        .bind(patch.description.is_some())
        .bind(patch.description.flatten())
        .bind(patch.is_tracking)
        .fetch_optional(self.pool.as_ref())
        .await?;

        record.ok_or_else(|| AppError::not_found("Short URL not found", json!({ "id": id })))
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET deleted_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, page: i64, page_size: i64) -> Result<Vec<ShortUrl>, AppError> {
        let offset = (page.max(1) - 1) * page_size;

        let records = sqlx::query_as::<_, ShortUrl>(
            r#"
            SELECT id, long_url, alias, campaign, medium, content, description, creator,
                   is_tracking, hits, last_used, created, deleted_at
            FROM short_urls
            WHERE deleted_at IS NULL
            ORDER BY last_used DESC NULLS LAST, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page_size)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(records)
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM short_urls WHERE deleted_at IS NULL")
                .fetch_one(self.pool.as_ref())
                .await?;

        Ok(count)
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .is_ok()
    }
}
