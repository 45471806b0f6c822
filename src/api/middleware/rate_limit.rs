//! Per-client rate limiting for redirect routes using a token bucket.

use anyhow::{Context, Result};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::{KeyExtractor, PeerIpKeyExtractor, SmartIpKeyExtractor},
};

/// Rate limiter keyed by the socket peer address.
///
/// Requests exceeding the limit receive `429 Too Many Requests`.
///
/// # Errors
///
/// Returns an error if `per_second` or `burst` is zero.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/{segment}", get(redirect_handler))
///     .layer(rate_limit::layer(50, 200)?);
/// ```
pub fn layer(
    per_second: u64,
    burst: u32,
) -> Result<GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>> {
    build(PeerIpKeyExtractor, per_second, burst)
}

/// Rate limiter keyed by `X-Forwarded-For` / `X-Real-IP`, falling back to the peer address.
///
/// Use only behind a trusted reverse proxy; clients can forge these headers.
///
/// # Errors
///
/// Returns an error if `per_second` or `burst` is zero.
pub fn proxied_layer(
    per_second: u64,
    burst: u32,
) -> Result<GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>>
{
    build(SmartIpKeyExtractor, per_second, burst)
}

fn build<K: KeyExtractor>(
    key_extractor: K,
    per_second: u64,
    burst: u32,
) -> Result<GovernorLayer<K, NoOpMiddleware<QuantaInstant>, axum::body::Body>> {
    anyhow::ensure!(per_second > 0, "rate limit must be at least 1 request per second");

    // one token is replenished every `interval` milliseconds
    let interval = (1000 / per_second).max(1);

    let governor_conf = GovernorConfigBuilder::default()
        .key_extractor(key_extractor)
        .per_millisecond(interval)
        .burst_size(burst)
        .finish()
        .context("Invalid rate limit configuration")?;

    Ok(GovernorLayer::new(Arc::new(governor_conf)))
}
