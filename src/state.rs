//! Shared state injected into every handler.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::application::services::{RedirectService, RedirectSettings, ResolverService};
use crate::domain::hit_event::HitEvent;
use crate::domain::repositories::ShortUrlRepository;
use crate::infrastructure::cache::CacheService;
use crate::utils::key_codec::KeyCodec;

#[derive(Clone)]
pub struct AppState {
    pub redirect_service: Arc<RedirectService>,
    pub repository: Arc<dyn ShortUrlRepository>,
    pub cache: Arc<dyn CacheService>,
}

impl AppState {
    /// Wires the redirect path over a repository and cache.
    ///
    /// `hit_sender` feeds the hit worker; it is unused in strict accounting mode.
    pub fn new(
        repository: Arc<dyn ShortUrlRepository>,
        cache: Arc<dyn CacheService>,
        hit_sender: mpsc::Sender<HitEvent>,
        codec: KeyCodec,
        settings: RedirectSettings,
    ) -> Self {
        let resolver = Arc::new(ResolverService::new(
            repository.clone(),
            cache.clone(),
            codec,
            settings.store_timeout,
        ));
        let redirect_service = Arc::new(RedirectService::new(
            resolver,
            repository.clone(),
            hit_sender,
            settings,
        ));

        Self {
            redirect_service,
            repository,
            cache,
        }
    }
}
