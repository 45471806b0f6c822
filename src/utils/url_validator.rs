//! Destination URL validation.
//!
//! Destinations must be absolute HTTP(S) URLs with a host. The stored form
//! has a lowercase host and no default port; path, query and fragment are
//! kept as given.

use url::Url;

/// Errors that can occur while validating a destination URL.
#[derive(Debug, thiserror::Error)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL must include a host")]
    MissingHost,
}

/// Validates a destination URL and returns its canonical form.
///
/// # Errors
///
/// Returns [`UrlValidationError::InvalidFormat`] for malformed or relative URLs,
/// [`UrlValidationError::UnsupportedProtocol`] for non-HTTP(S) schemes such as
/// `javascript:` or `data:`, and [`UrlValidationError::MissingHost`] if there
/// is no host.
pub fn validate_destination_url(input: &str) -> Result<String, UrlValidationError> {
    let url = Url::parse(input.trim())
        .map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(UrlValidationError::UnsupportedProtocol),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    // the parser lowercases domain hosts and drops default ports of special schemes
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_simple_http() {
        assert_eq!(
            validate_destination_url("http://www.example.com").unwrap(),
            "http://www.example.com/"
        );
    }

    #[test]
    fn test_validate_lowercases_host() {
        assert_eq!(
            validate_destination_url("https://EXAMPLE.com/Path").unwrap(),
            "https://example.com/Path"
        );
    }

    #[test]
    fn test_validate_drops_default_port() {
        assert_eq!(
            validate_destination_url("https://example.com:443/path").unwrap(),
            "https://example.com/path"
        );
    }

    #[test]
    fn test_validate_keeps_query_and_fragment() {
        assert_eq!(
            validate_destination_url("https://example.com/p?a=1#top").unwrap(),
            "https://example.com/p?a=1#top"
        );
    }

    #[test]
    fn test_validate_rejects_relative() {
        assert!(matches!(
            validate_destination_url("/just/a/path"),
            Err(UrlValidationError::InvalidFormat(_))
        ));
        assert!(validate_destination_url("").is_err());
    }

    #[test]
    fn test_validate_rejects_other_schemes() {
        assert!(matches!(
            validate_destination_url("javascript:alert(1)"),
            Err(UrlValidationError::UnsupportedProtocol)
        ));
        assert!(matches!(
            validate_destination_url("ftp://example.com/file"),
            Err(UrlValidationError::UnsupportedProtocol)
        ));
    }
}
