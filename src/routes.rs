//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /{segment}`          - Short URL redirect by alias or key
//! - `GET  /{prefix}/{segment}` - Alias-only redirect (when `ALIAS_PATH_PREFIX` is set)
//! - `GET  /health`             - Health check: store, hit queue, cache
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-IP token bucket on redirect routes
//! - **Path normalization** - Trailing slash handling

use crate::api::handlers::health_handler;
use crate::api::middleware::{rate_limit, tracing};
use crate::api::routes::redirect_routes;
use crate::config::Config;
use crate::state::AppState;
use anyhow::Result;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
///
/// Rate limiting reads client IPs from forwarding headers when
/// `config.behind_proxy` is set; otherwise from the peer socket address,
/// which requires serving with connect info.
///
/// # Errors
///
/// Returns an error if the rate limit settings are invalid.
pub fn app_router(state: AppState, config: &Config) -> Result<NormalizePath<Router>> {
    let redirects = redirect_routes(config.alias_path_prefix.as_deref());
    let redirects = if config.behind_proxy {
        redirects.layer(rate_limit::proxied_layer(
            config.rate_limit_per_second,
            config.rate_limit_burst,
        )?)
    } else {
        redirects.layer(rate_limit::layer(
            config.rate_limit_per_second,
            config.rate_limit_burst,
        )?)
    };

    let router = Router::new()
        .route("/health", get(health_handler))
        .merge(redirects)
        .with_state(state)
        .layer(tracing::layer());

    Ok(NormalizePathLayer::trim_trailing_slash().layer(router))
}
