//! Redirect orchestration: resolve, count, build, respond.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, warn};

use crate::application::services::ResolverService;
use crate::domain::entities::ShortUrl;
use crate::domain::hit_event::HitEvent;
use crate::domain::hit_worker::increment_with_timeout;
use crate::domain::redirect_error::RedirectError;
use crate::domain::repositories::ShortUrlRepository;
use crate::utils::tracking_url::{CampaignTags, build_redirect_url};

/// Which resolution a route performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionScope {
    /// Alias lookup with key decoding as fallback.
    Full,
    /// Alias lookup only.
    AliasOnly,
}

/// Where and how to redirect the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub location: String,
    /// 301 for tracking records, 302 otherwise.
    pub permanent: bool,
}

/// Redirect behaviour switches.
#[derive(Debug, Clone, Copy)]
pub struct RedirectSettings {
    /// Append `utm_nooverride=1` to tracking redirects.
    pub nooverride: bool,
    /// Await the hit update and fail the request if it fails.
    pub strict_accounting: bool,
    pub store_timeout: Duration,
}

/// Runs one redirect request through `Resolving -> Counting -> Building`.
///
/// Resolution failures end the request. In best-effort mode the hit is
/// handed to the hit worker without waiting; a full queue drops it. In
/// strict mode the increment is awaited under the store timeout.
pub struct RedirectService {
    resolver: Arc<ResolverService>,
    repository: Arc<dyn ShortUrlRepository>,
    hit_sender: mpsc::Sender<HitEvent>,
    settings: RedirectSettings,
}

impl RedirectService {
    pub fn new(
        resolver: Arc<ResolverService>,
        repository: Arc<dyn ShortUrlRepository>,
        hit_sender: mpsc::Sender<HitEvent>,
        settings: RedirectSettings,
    ) -> Self {
        Self {
            resolver,
            repository,
            hit_sender,
            settings,
        }
    }

    /// Resolves `segment` and builds the redirect target.
    ///
    /// `caller_params` are the query parameters of the inbound request; they
    /// are passed through to the destination.
    ///
    /// # Errors
    ///
    /// Any [`RedirectError`]; [`RedirectError::AccountingFailure`] only in
    /// strict mode.
    pub async fn redirect(
        &self,
        segment: &str,
        caller_params: &[(String, String)],
        scope: ResolutionScope,
    ) -> Result<RedirectTarget, RedirectError> {
        let record = match scope {
            ResolutionScope::Full => self.resolver.resolve(segment).await?,
            ResolutionScope::AliasOnly => self.resolver.resolve_alias(segment).await?,
        };

        self.count(&record, segment).await?;

        self.build(&record, caller_params)
    }

    /// Whether the hit queue still has a running consumer.
    pub fn hit_queue_open(&self) -> bool {
        !self.hit_sender.is_closed()
    }

    /// Free slots in the hit queue.
    pub fn hit_queue_capacity(&self) -> usize {
        self.hit_sender.capacity()
    }

    async fn count(&self, record: &ShortUrl, segment: &str) -> Result<(), RedirectError> {
        if self.settings.strict_accounting {
            return increment_with_timeout(
                self.repository.as_ref(),
                record.id,
                self.settings.store_timeout,
            )
            .await
            .map_err(|e| {
                error!(id = record.id, segment, error = %e, "Hit accounting failed");
                RedirectError::AccountingFailure {
                    id: record.id,
                    reason: e.to_string(),
                }
            });
        }

        match self.hit_sender.try_send(HitEvent::new(record.id, segment)) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                metrics::counter!("hits_dropped_total").increment(1);
                warn!(id = event.id, segment, "Hit queue full, dropping hit");
            }
            Err(TrySendError::Closed(event)) => {
                metrics::counter!("hits_dropped_total").increment(1);
                warn!(id = event.id, segment, "Hit queue closed, dropping hit");
            }
        }
        Ok(())
    }

    fn build(
        &self,
        record: &ShortUrl,
        caller_params: &[(String, String)],
    ) -> Result<RedirectTarget, RedirectError> {
        let key = self.resolver.codec().encode(record.key_value());
        let tags = record.is_tracking.then(|| CampaignTags {
            source: &key,
            campaign: record.campaign.as_deref(),
            medium: record.medium.as_deref(),
            content: record.content.as_deref(),
        });

        let location = build_redirect_url(
            &record.long_url,
            tags.as_ref(),
            caller_params,
            self.settings.nooverride,
        )
        .map_err(|e| {
            error!(id = record.id, error = %e, "Stored destination is not a valid URL");
            RedirectError::InvalidDestination {
                id: record.id,
                reason: e.to_string(),
            }
        })?;

        Ok(RedirectTarget {
            location,
            permanent: record.is_tracking,
        })
    }
}
