#![allow(dead_code)]

use axum::{Router, routing::get};
use axum_test::TestServer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use url_redirector::api::handlers::health_handler;
use url_redirector::api::routes::redirect_routes;
use url_redirector::application::services::{
    RedirectSettings, ShortUrlService, ShortUrlSettings,
};
use url_redirector::domain::entities::{NewShortUrl, ShortUrl};
use url_redirector::domain::hit_event::HitEvent;
use url_redirector::domain::repositories::ShortUrlRepository;
use url_redirector::infrastructure::cache::NullCache;
use url_redirector::infrastructure::persistence::InMemoryShortUrlRepository;
use url_redirector::state::AppState;
use url_redirector::utils::key_codec::KeyCodec;

pub const BASE_URL: &str = "https://go.example.com";
pub const ALIAS_PREFIX: &str = "a";

pub fn settings(strict_accounting: bool, nooverride: bool) -> RedirectSettings {
    RedirectSettings {
        nooverride,
        strict_accounting,
        store_timeout: Duration::from_millis(500),
    }
}

pub fn create_test_state(
    repository: Arc<InMemoryShortUrlRepository>,
    settings: RedirectSettings,
) -> (AppState, mpsc::Receiver<HitEvent>) {
    create_test_state_with_codec(repository, settings, KeyCodec::new(false))
}

pub fn create_test_state_with_codec(
    repository: Arc<InMemoryShortUrlRepository>,
    settings: RedirectSettings,
    codec: KeyCodec,
) -> (AppState, mpsc::Receiver<HitEvent>) {
    let (tx, rx) = mpsc::channel(100);

    let state = AppState::new(
        repository,
        Arc::new(NullCache::new()),
        tx,
        codec,
        settings,
    );

    (state, rx)
}

pub fn create_test_service(repository: Arc<InMemoryShortUrlRepository>) -> ShortUrlService {
    create_test_service_with_codec(repository, KeyCodec::new(false))
}

pub fn create_test_service_with_codec(
    repository: Arc<InMemoryShortUrlRepository>,
    codec: KeyCodec,
) -> ShortUrlService {
    ShortUrlService::new(
        repository,
        Arc::new(NullCache::new()),
        ShortUrlSettings {
            base_url: BASE_URL.to_string(),
            alias_prefix: Some(ALIAS_PREFIX.to_string()),
            codec,
        },
    )
}

pub fn create_test_server(state: AppState) -> TestServer {
    let app = Router::new()
        .route("/health", get(health_handler))
        .merge(redirect_routes(Some(ALIAS_PREFIX)))
        .with_state(state);

    TestServer::new(app).unwrap()
}

pub fn tracking_link(url: &str) -> NewShortUrl {
    NewShortUrl {
        long_url: url.to_string(),
        campaign: Some("Spring".to_string()),
        medium: Some("Email".to_string()),
        content: Some("Banner".to_string()),
        is_tracking: true,
        ..Default::default()
    }
}

pub fn plain_link(url: &str) -> NewShortUrl {
    NewShortUrl {
        long_url: url.to_string(),
        is_tracking: false,
        ..Default::default()
    }
}

pub async fn create_link(service: &ShortUrlService, input: NewShortUrl) -> ShortUrl {
    service.create(input).await.unwrap()
}

/// Polls the store until the record reaches `hits` or the deadline passes.
pub async fn wait_for_hits(repository: &InMemoryShortUrlRepository, id: i64, hits: i64) -> ShortUrl {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let record = repository.get_by_id(id).await.unwrap().unwrap();
        if record.hits >= hits || tokio::time::Instant::now() >= deadline {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
