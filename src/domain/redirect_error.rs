//! Failure taxonomy of the redirect path.

use serde_json::json;

use crate::error::AppError;
use crate::utils::key_codec::KeyDecodeError;

/// Why a redirect request did not produce a redirect.
///
/// Resolution failures are terminal for the request. Accounting failures
/// only surface when strict accounting is configured.
#[derive(Debug, thiserror::Error)]
pub enum RedirectError {
    /// The segment is neither a known alias nor a decodable key.
    #[error("'{segment}' is not a valid identifier: {source}")]
    InvalidIdentifier {
        segment: String,
        #[source]
        source: KeyDecodeError,
    },

    /// The segment resolved cleanly but no live record matches.
    #[error("no short URL for '{segment}'")]
    NotFound { segment: String },

    /// The store failed or timed out while resolving.
    #[error("store unavailable while resolving '{segment}': {reason}")]
    StoreUnavailable { segment: String, reason: String },

    /// The hit counter update failed after a successful resolution.
    #[error("hit accounting failed for record {id}: {reason}")]
    AccountingFailure { id: i64, reason: String },

    /// The stored destination could not be turned into a redirect target.
    #[error("record {id} has an unusable destination: {reason}")]
    InvalidDestination { id: i64, reason: String },
}

impl RedirectError {
    /// Label used for failure metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            RedirectError::InvalidIdentifier { .. } => "invalid_identifier",
            RedirectError::NotFound { .. } => "not_found",
            RedirectError::StoreUnavailable { .. } => "store_unavailable",
            RedirectError::AccountingFailure { .. } => "accounting_failure",
            RedirectError::InvalidDestination { .. } => "invalid_destination",
        }
    }
}

impl From<RedirectError> for AppError {
    fn from(e: RedirectError) -> Self {
        match e {
            RedirectError::InvalidIdentifier { segment, .. } | RedirectError::NotFound { segment } => {
                AppError::not_found("Short URL not found", json!({ "segment": segment }))
            }
            RedirectError::StoreUnavailable { .. } => {
                AppError::unavailable("Storage temporarily unavailable", json!({}))
            }
            RedirectError::AccountingFailure { .. } => {
                AppError::internal("Failed to record usage", json!({}))
            }
            RedirectError::InvalidDestination { id, .. } => {
                AppError::internal("Invalid destination URL", json!({ "id": id }))
            }
        }
    }
}
