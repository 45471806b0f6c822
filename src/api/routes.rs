//! Redirect route configuration.

use crate::api::handlers::{alias_redirect_handler, redirect_handler};
use crate::state::AppState;
use axum::{Router, routing::get};

/// Public redirect routes.
///
/// # Endpoints
///
/// - `GET /{segment}`          - Redirect by alias or key
/// - `GET /{prefix}/{segment}` - Redirect by alias only, when `alias_prefix` is set
pub fn redirect_routes(alias_prefix: Option<&str>) -> Router<AppState> {
    let router = Router::new().route("/{segment}", get(redirect_handler));

    match alias_prefix {
        Some(prefix) => router.route(
            &format!("/{prefix}/{{segment}}"),
            get(alias_redirect_handler),
        ),
        None => router,
    }
}
