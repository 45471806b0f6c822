//! Business logic services for the application layer.

pub mod redirect_service;
pub mod resolver_service;
pub mod short_url_service;

pub use redirect_service::{RedirectService, RedirectSettings, RedirectTarget, ResolutionScope};
pub use resolver_service::ResolverService;
pub use short_url_service::{ShortUrlService, ShortUrlSettings};
