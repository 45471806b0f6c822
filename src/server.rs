//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache setup, hit worker spawning, and Axum server lifecycle.

use crate::application::services::RedirectSettings;
use crate::config::Config;
use crate::domain::hit_worker::{HitWorkerSettings, run_hit_worker};
use crate::domain::repositories::ShortUrlRepository;
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache};
use crate::infrastructure::persistence::PgShortUrlRepository;
use crate::routes::app_router;
use crate::state::AppState;
use crate::utils::key_codec::KeyCodec;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc;

/// How long pending hits may take to drain after the server stops.
const HIT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Redis cache (or NullCache fallback)
/// - Background hit worker
/// - Axum HTTP server with graceful shutdown
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migrations fail
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let cache: Arc<dyn CacheService> = if let Some(redis_url) = &config.redis_url {
        match RedisCache::connect(redis_url, config.cache_ttl_seconds).await {
            Ok(redis) => {
                tracing::info!("Cache enabled (Redis)");
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                Arc::new(NullCache::new())
            }
        }
    } else {
        tracing::info!("Cache disabled (NullCache)");
        Arc::new(NullCache::new())
    };

    let repository: Arc<dyn ShortUrlRepository> =
        Arc::new(PgShortUrlRepository::new(Arc::new(pool)));

    let (hit_tx, hit_rx) = mpsc::channel(config.hit_queue_capacity);
    let worker = tokio::spawn(run_hit_worker(
        hit_rx,
        repository.clone(),
        HitWorkerSettings {
            concurrency: config.hit_worker_concurrency,
            store_timeout: config.store_timeout(),
        },
    ));
    tracing::info!("Hit worker started");

    let state = AppState::new(
        repository,
        cache,
        hit_tx,
        KeyCodec::new(config.key_checksum),
        RedirectSettings {
            nooverride: config.utm_nooverride,
            strict_accounting: config.strict_accounting,
            store_timeout: config.store_timeout(),
        },
    );

    let app = app_router(state, &config)?;

    let addr = config.listen_addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // the router held the last hit sender; the worker now drains and exits
    match tokio::time::timeout(HIT_DRAIN_TIMEOUT, worker).await {
        Ok(Ok(())) => tracing::info!("Pending hits flushed"),
        Ok(Err(e)) => tracing::error!("Hit worker task failed: {}", e),
        Err(_) => tracing::warn!("Timed out flushing pending hits"),
    }

    Ok(())
}

/// Resolves on SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping server");
}
