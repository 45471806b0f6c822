//! Alias normalization and validation.

use crate::error::AppError;
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

/// Longest accepted alias.
pub const MAX_ALIAS_LENGTH: usize = 16;

/// Compiled pattern for a normalized alias.
pub static ALIAS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]{1,16}$").expect("alias pattern compiles"));

/// Compiled pattern for an inbound path segment.
///
/// A key check symbol outside `[0-9A-Z]` (`*`, `~`, `$`, `=`) is only
/// allowed as the last character; the codec decides whether it is valid.
pub static SEGMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9-]+[*~$=]?$").expect("segment pattern compiles"));

/// Aliases that would shadow fixed routes.
const RESERVED_ALIASES: &[&str] = &["health"];

/// Case-folds an alias or inbound segment for alias lookup.
pub fn normalize_alias(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

/// Returns true if `segment` may be routed to resolution at all.
pub fn is_valid_segment(segment: &str) -> bool {
    SEGMENT_REGEX.is_match(segment)
}

/// Normalizes and validates an operator-chosen alias.
///
/// # Rules
///
/// - Lowercased before validation
/// - 1-16 characters from `[a-z0-9-]`
/// - Not a reserved route name, nor the configured alias path prefix
///
/// # Errors
///
/// Returns [`AppError::Validation`] if any rule is violated.
pub fn validate_alias(input: &str, alias_prefix: Option<&str>) -> Result<String, AppError> {
    let alias = normalize_alias(input);

    if alias.is_empty() || alias.len() > MAX_ALIAS_LENGTH {
        return Err(AppError::bad_request(
            "Alias must be 1-16 characters",
            json!({ "provided_length": alias.len() }),
        ));
    }

    if !ALIAS_REGEX.is_match(&alias) {
        return Err(AppError::bad_request(
            "Alias can only contain letters, digits, and hyphens",
            json!({ "alias": alias }),
        ));
    }

    if RESERVED_ALIASES.contains(&alias.as_str()) || alias_prefix.is_some_and(|p| p == alias) {
        return Err(AppError::bad_request(
            "This alias is reserved",
            json!({ "alias": alias }),
        ));
    }

    Ok(alias)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_alias_lowercases() {
        assert_eq!(validate_alias("Promo", None).unwrap(), "promo");
        assert_eq!(validate_alias("  Spring-2024 ", None).unwrap(), "spring-2024");
    }

    #[test]
    fn test_validate_alias_length() {
        assert!(validate_alias("", None).is_err());
        assert!(validate_alias("a", None).is_ok());
        assert!(validate_alias(&"a".repeat(16), None).is_ok());
        assert!(validate_alias(&"a".repeat(17), None).is_err());
    }

    #[test]
    fn test_validate_alias_characters() {
        assert!(validate_alias("under_score", None).is_err());
        assert!(validate_alias("dot.ted", None).is_err());
        assert!(validate_alias("slash/ed", None).is_err());
        assert!(validate_alias("ünï", None).is_err());
    }

    #[test]
    fn test_validate_alias_reserved() {
        assert!(matches!(
            validate_alias("health", None),
            Err(AppError::Validation { .. })
        ));
        assert!(validate_alias("a", Some("a")).is_err());
        assert!(validate_alias("a", Some("go")).is_ok());
    }

    #[test]
    fn test_segment_pattern() {
        assert!(is_valid_segment("abc-123"));
        assert!(is_valid_segment("ZZZ"));
        assert!(!is_valid_segment(""));
        assert!(!is_valid_segment("a_b"));
        assert!(!is_valid_segment("a.b"));
    }

    #[test]
    fn test_segment_pattern_allows_trailing_check_symbol() {
        for segment in ["10*", "11~", "12$", "13=", "14U"] {
            assert!(is_valid_segment(segment), "{segment}");
        }
        assert!(!is_valid_segment("*"));
        assert!(!is_valid_segment("1*0"));
        assert!(!is_valid_segment("10**"));
    }
}
