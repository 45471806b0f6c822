//! Background worker applying hit counter updates.
//!
//! Receives [`HitEvent`]s from the redirect handler and calls the store's
//! atomic increment with bounded concurrency. Each update is bounded by the
//! store timeout; store-reported errors are retried with exponential
//! backoff, timeouts are not, since a timed-out update may already have
//! been applied.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

use crate::domain::hit_event::HitEvent;
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;

const MAX_RETRIES: usize = 3;

/// Why a single hit could not be recorded.
#[derive(Debug, thiserror::Error)]
pub enum HitError {
    #[error("store did not answer within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl HitError {
    fn is_retryable(&self) -> bool {
        matches!(self, HitError::Store(_))
    }
}

/// Runtime settings of the hit worker.
#[derive(Debug, Clone, Copy)]
pub struct HitWorkerSettings {
    pub concurrency: usize,
    pub store_timeout: Duration,
}

/// Applies one increment under the store timeout.
///
/// # Errors
///
/// Returns [`HitError::Timeout`] if the store does not answer in time and
/// [`HitError::Store`] if it reports a failure.
pub async fn increment_with_timeout(
    repository: &dyn ShortUrlRepository,
    id: i64,
    store_timeout: Duration,
) -> Result<(), HitError> {
    tokio::time::timeout(store_timeout, repository.increment_hits(id))
        .await
        .map_err(|_| HitError::Timeout(store_timeout))?
        .map_err(HitError::from)
}

/// Records one hit, retrying store-reported failures.
pub async fn record_hit(
    repository: Arc<dyn ShortUrlRepository>,
    event: &HitEvent,
    store_timeout: Duration,
) -> Result<(), HitError> {
    let strategy = ExponentialBackoff::from_millis(2)
        .factor(5)
        .max_delay(Duration::from_millis(200))
        .map(jitter)
        .take(MAX_RETRIES);
    let id = event.id;

    RetryIf::spawn(
        strategy,
        || {
            let repository = repository.clone();
            async move { increment_with_timeout(repository.as_ref(), id, store_timeout).await }
        },
        HitError::is_retryable,
    )
    .await
}

/// Consumes hit events until every sender is dropped.
///
/// In-flight updates are awaited before returning.
pub async fn run_hit_worker(
    mut rx: mpsc::Receiver<HitEvent>,
    repository: Arc<dyn ShortUrlRepository>,
    settings: HitWorkerSettings,
) {
    let concurrency = settings.concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));

    while let Some(event) = rx.recv().await {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let repository = repository.clone();

        tokio::spawn(async move {
            let _permit = permit;
            match record_hit(repository, &event, settings.store_timeout).await {
                Ok(()) => debug!(id = event.id, segment = %event.segment, "Hit recorded"),
                Err(e) => {
                    metrics::counter!("hits_failed_total").increment(1);
                    warn!(id = event.id, segment = %event.segment, error = %e, "Failed to record hit");
                }
            }
        });
    }

    let _ = semaphore.acquire_many(concurrency as u32).await;
    info!("Hit worker stopped");
}
