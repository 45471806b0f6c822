//! Short URL repository implementations.
//!
//! # Repositories
//!
//! - [`PgShortUrlRepository`] - PostgreSQL storage via SQLx
//! - [`InMemoryShortUrlRepository`] - DashMap storage for tests and local runs

pub mod memory_short_url_repository;
pub mod pg_short_url_repository;

pub use memory_short_url_repository::InMemoryShortUrlRepository;
pub use pg_short_url_repository::PgShortUrlRepository;
