//! Pure helpers shared by the redirect path and the admin tooling.
//!
//! - [`key_codec`] - Crockford base32 short keys
//! - [`tracking_url`] - Campaign parameter injection
//! - [`alias`] - Alias normalization and validation
//! - [`url_validator`] - Destination URL validation

pub mod alias;
pub mod key_codec;
pub mod tracking_url;
pub mod url_validator;
