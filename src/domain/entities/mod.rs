//! Core domain entities.
//!
//! Entities are plain data structures. Creation and partial updates use
//! dedicated input types:
//!
//! - [`ShortUrl`] - A stored short URL record
//! - [`NewShortUrl`] - Input for creating a record
//! - [`ShortUrlPatch`] - Partial update of a record
//! - [`RecordField`] - Label columns offered as suggestions

pub mod short_url;

pub use short_url::{NewShortUrl, RecordField, ShortUrl, ShortUrlPatch};

#[cfg(test)]
pub(crate) use short_url::sample_short_url;
