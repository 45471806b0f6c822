//! Short URL record: a redirect mapping with campaign labels and usage counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Longest accepted campaign label.
pub const MAX_LABEL_LENGTH: u64 = 64;

/// A stored short URL.
///
/// `id` is assigned by the store and never reused; the public short key is
/// derived from it. `hits` and `last_used` are only changed by the store's
/// atomic increment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShortUrl {
    pub id: i64,
    pub long_url: String,
    pub alias: Option<String>,
    pub campaign: Option<String>,
    pub medium: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    pub creator: Option<String>,
    pub is_tracking: bool,
    pub hits: i64,
    pub last_used: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ShortUrl {
    /// Returns true if the record has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// The id as the codec's unsigned input.
    ///
    /// Store ids are positive, so this never truncates.
    pub fn key_value(&self) -> u64 {
        self.id.unsigned_abs()
    }
}

/// Input for creating a record.
#[derive(Debug, Clone, Default, Validate)]
pub struct NewShortUrl {
    pub long_url: String,
    pub alias: Option<String>,
    #[validate(length(max = MAX_LABEL_LENGTH))]
    pub campaign: Option<String>,
    #[validate(length(max = MAX_LABEL_LENGTH))]
    pub medium: Option<String>,
    #[validate(length(max = MAX_LABEL_LENGTH))]
    pub content: Option<String>,
    pub description: Option<String>,
    pub creator: Option<String>,
    pub is_tracking: bool,
}

/// Partial update for an existing record.
///
/// `None` fields are left unchanged. For the optional columns,
/// `Some(None)` clears the value and `Some(Some(v))` sets it.
#[derive(Debug, Clone, Default, Validate)]
pub struct ShortUrlPatch {
    pub long_url: Option<String>,
    pub alias: Option<Option<String>>,
    #[validate(length(max = MAX_LABEL_LENGTH))]
    pub campaign: Option<Option<String>>,
    #[validate(length(max = MAX_LABEL_LENGTH))]
    pub medium: Option<Option<String>>,
    #[validate(length(max = MAX_LABEL_LENGTH))]
    pub content: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub is_tracking: Option<bool>,
}

impl ShortUrlPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.long_url.is_none()
            && self.alias.is_none()
            && self.campaign.is_none()
            && self.medium.is_none()
            && self.content.is_none()
            && self.description.is_none()
            && self.is_tracking.is_none()
    }

    /// Applies the patch to an in-memory record.
    pub fn apply_to(self, record: &mut ShortUrl) {
        if let Some(long_url) = self.long_url {
            record.long_url = long_url;
        }
        if let Some(alias) = self.alias {
            record.alias = alias;
        }
        if let Some(campaign) = self.campaign {
            record.campaign = campaign;
        }
        if let Some(medium) = self.medium {
            record.medium = medium;
        }
        if let Some(content) = self.content {
            record.content = content;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(is_tracking) = self.is_tracking {
            record.is_tracking = is_tracking;
        }
    }
}

/// Label columns that support distinct-value suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    Campaign,
    Medium,
}

impl RecordField {
    /// Column name backing this field.
    pub fn column(&self) -> &'static str {
        match self {
            RecordField::Campaign => "campaign",
            RecordField::Medium => "medium",
        }
    }

    /// Reads this field from a record.
    pub fn value_of<'a>(&self, record: &'a ShortUrl) -> Option<&'a str> {
        match self {
            RecordField::Campaign => record.campaign.as_deref(),
            RecordField::Medium => record.medium.as_deref(),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_short_url(id: i64) -> ShortUrl {
    ShortUrl {
        id,
        long_url: "http://www.example.com".to_string(),
        alias: None,
        campaign: Some("Example".to_string()),
        medium: Some("Email".to_string()),
        content: Some("Test".to_string()),
        description: None,
        creator: None,
        is_tracking: true,
        hits: 0,
        last_used: None,
        created: Utc::now(),
        deleted_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_url_defaults() {
        let record = sample_short_url(7);

        assert_eq!(record.id, 7);
        assert_eq!(record.key_value(), 7);
        assert_eq!(record.hits, 0);
        assert!(record.last_used.is_none());
        assert!(!record.is_deleted());
    }

    #[test]
    fn test_patch_applies_only_present_fields() {
        let mut record = sample_short_url(1);
        record.alias = Some("promo".to_string());

        let patch = ShortUrlPatch {
            medium: Some(None),
            is_tracking: Some(false),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply_to(&mut record);

        assert_eq!(record.alias.as_deref(), Some("promo"));
        assert_eq!(record.campaign.as_deref(), Some("Example"));
        assert!(record.medium.is_none());
        assert!(!record.is_tracking);
    }

    #[test]
    fn test_label_length_limit() {
        let ok = NewShortUrl {
            campaign: Some("c".repeat(64)),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let too_long = ShortUrlPatch {
            medium: Some(Some("m".repeat(65))),
            ..Default::default()
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_empty_patch() {
        assert!(ShortUrlPatch::default().is_empty());
    }

    #[test]
    fn test_record_field_value_of() {
        let record = sample_short_url(1);
        assert_eq!(RecordField::Campaign.value_of(&record), Some("Example"));
        assert_eq!(RecordField::Medium.value_of(&record), Some("Email"));
        assert_eq!(RecordField::Campaign.column(), "campaign");
    }
}
