//! Application layer services implementing business logic.
//!
//! Services consume the repository trait and the cache and provide the API
//! used by HTTP handlers and the admin CLI.
//!
//! # Available Services
//!
//! - [`services::resolver_service::ResolverService`] - Segment to record resolution
//! - [`services::redirect_service::RedirectService`] - Redirect request orchestration
//! - [`services::short_url_service::ShortUrlService`] - Record administration

pub mod services;
