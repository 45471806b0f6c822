//! HTTP layer: handlers, response DTOs, middleware and routes.
//!
//! # Modules
//!
//! - [`dto`] - Response bodies
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Rate limiting and request tracing
//! - [`routes`] - Redirect route composition

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
