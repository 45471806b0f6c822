//! HTTP request handlers.

pub mod health;
pub mod redirect;

pub use health::health_handler;
pub use redirect::{alias_redirect_handler, redirect_handler};
