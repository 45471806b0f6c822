//! Handlers for short URL redirects.

use axum::{
    extract::{Path, RawQuery, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

use crate::application::services::{RedirectTarget, ResolutionScope};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::alias::is_valid_segment;

/// Redirects a key or alias to its destination.
///
/// # Endpoint
///
/// `GET /{segment}`
///
/// # Request Flow
///
/// 1. Reject segments outside `[a-zA-Z0-9-]+`, allowing one trailing key check symbol
/// 2. Resolve by alias, then by decoded key (cache first, then store)
/// 3. Count the hit (queued, or awaited in strict accounting mode)
/// 4. Merge campaign parameters and the request's query into the destination
///
/// # Responses
///
/// - **301 Moved Permanently** for tracking records
/// - **302 Found** for non-tracking records
/// - **404 Not Found** if the segment resolves to nothing
/// - **503 Service Unavailable** if the store fails during resolution
/// - **500 Internal Server Error** if strict accounting fails
pub async fn redirect_handler(
    Path(segment): Path<String>,
    RawQuery(query): RawQuery,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    redirect(&state, &segment, query.as_deref(), ResolutionScope::Full).await
}

/// Redirects an alias under the configured alias path prefix.
///
/// # Endpoint
///
/// `GET /{prefix}/{segment}`
///
/// Keys are never decoded on this route.
pub async fn alias_redirect_handler(
    Path(segment): Path<String>,
    RawQuery(query): RawQuery,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    redirect(&state, &segment, query.as_deref(), ResolutionScope::AliasOnly).await
}

async fn redirect(
    state: &AppState,
    segment: &str,
    query: Option<&str>,
    scope: ResolutionScope,
) -> Result<Response, AppError> {
    if !is_valid_segment(segment) {
        metrics::counter!("redirect_failures_total", "reason" => "invalid_segment").increment(1);
        warn!(segment, "Rejected malformed segment");
        return Err(AppError::not_found(
            "Short URL not found",
            json!({ "segment": segment }),
        ));
    }

    let params = caller_params(query);

    match state
        .redirect_service
        .redirect(segment, &params, scope)
        .await
    {
        Ok(target) => Ok(redirect_response(target)),
        Err(e) => {
            metrics::counter!("redirect_failures_total", "reason" => e.reason()).increment(1);
            Err(e.into())
        }
    }
}

/// Parses the inbound query; a repeated key keeps its last value.
fn caller_params(query: Option<&str>) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = Vec::new();

    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()).into_owned()
    {
        match params.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => params.push((key, value)),
        }
    }

    params
}

fn redirect_response(target: RedirectTarget) -> Response {
    let status = if target.permanent {
        StatusCode::MOVED_PERMANENTLY
    } else {
        StatusCode::FOUND
    };
    metrics::counter!("redirects_total", "status" => status.as_str().to_string()).increment(1);

    (status, [(header::LOCATION, target.location)]).into_response()
}
