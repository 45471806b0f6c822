//! Infrastructure layer for external integrations.
//!
//! Implements the domain's repository trait and the redirect cache.
//!
//! # Modules
//!
//! - [`cache`] - Record cache (Redis and no-op implementations)
//! - [`persistence`] - PostgreSQL and in-memory repositories

pub mod cache;
pub mod persistence;
