//! Redirect target construction with campaign tracking parameters.
//!
//! Only the query component of the destination changes. Scheme, host, path
//! and fragment are carried over from the stored destination URL.

use url::Url;

pub const UTM_SOURCE: &str = "utm_source";
pub const UTM_CAMPAIGN: &str = "utm_campaign";
pub const UTM_MEDIUM: &str = "utm_medium";
pub const UTM_CONTENT: &str = "utm_content";
pub const UTM_NOOVERRIDE: &str = "utm_nooverride";

/// Errors raised while building a redirect target.
#[derive(Debug, thiserror::Error)]
pub enum TrackingUrlError {
    #[error("invalid destination URL: {0}")]
    InvalidDestination(#[from] url::ParseError),
}

/// Campaign labels injected into tracking redirects.
///
/// Labels are lowercased on output. `None` and empty labels are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct CampaignTags<'a> {
    pub source: &'a str,
    pub campaign: Option<&'a str>,
    pub medium: Option<&'a str>,
    pub content: Option<&'a str>,
}

/// Builds the final redirect URL.
///
/// With `tags` present the `utm_*` parameters are merged first, then the
/// caller-supplied parameters, then `utm_nooverride=1` when `nooverride` is
/// set. Without `tags` only the caller-supplied parameters are merged.
///
/// # Errors
///
/// Returns [`TrackingUrlError::InvalidDestination`] if `destination` is not
/// an absolute URL.
pub fn build_redirect_url(
    destination: &str,
    tags: Option<&CampaignTags<'_>>,
    caller_params: &[(String, String)],
    nooverride: bool,
) -> Result<String, TrackingUrlError> {
    let mut merge: Vec<(String, String)> = Vec::with_capacity(caller_params.len() + 5);

    if let Some(tags) = tags {
        merge.push((UTM_SOURCE.to_string(), tags.source.to_string()));
        for (name, value) in [
            (UTM_CAMPAIGN, tags.campaign),
            (UTM_MEDIUM, tags.medium),
            (UTM_CONTENT, tags.content),
        ] {
            merge.push((name.to_string(), value.unwrap_or_default().to_lowercase()));
        }
    }

    merge.extend(caller_params.iter().cloned());

    if tags.is_some() && nooverride {
        merge.push((UTM_NOOVERRIDE.to_string(), "1".to_string()));
    }

    add_query_params(destination, &merge)
}

/// Merges `params` into the query string of `url`.
///
/// Parameters with empty values are dropped from `params`. A key already in
/// the URL keeps its position but takes the merged value; every key appears
/// exactly once in the result.
///
/// # Errors
///
/// Returns [`TrackingUrlError::InvalidDestination`] if `url` cannot be parsed.
pub fn add_query_params(url: &str, params: &[(String, String)]) -> Result<String, TrackingUrlError> {
    let mut url = Url::parse(url)?;

    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut original = 0;
    for (key, value) in url.query_pairs().into_owned() {
        upsert(&mut pairs, key, value);
        original += 1;
    }

    let mut changed = pairs.len() != original;
    for (key, value) in params.iter().filter(|(_, v)| !v.is_empty()) {
        upsert(&mut pairs, key.clone(), value.clone());
        changed = true;
    }

    if !changed {
        return Ok(url.into());
    }

    url.query_pairs_mut().clear().extend_pairs(pairs.iter());
    Ok(url.into())
}

fn upsert(pairs: &mut Vec<(String, String)>, key: String, value: String) {
    match pairs.iter_mut().find(|(k, _)| *k == key) {
        Some(existing) => existing.1 = value,
        None => pairs.push((key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_of(url: &str) -> Vec<(String, String)> {
        Url::parse(url).unwrap().query_pairs().into_owned().collect()
    }

    fn value_of(url: &str, key: &str) -> Option<String> {
        query_of(url)
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    fn example_tags() -> CampaignTags<'static> {
        CampaignTags {
            source: "1",
            campaign: Some("Example"),
            medium: Some("Email"),
            content: Some("Test"),
        }
    }

    #[test]
    fn test_tracking_parameters_are_lowercased() {
        let url = build_redirect_url("http://www.example.com", Some(&example_tags()), &[], false)
            .unwrap();

        assert!(url.starts_with("http://www.example.com"));
        assert!(url.contains("utm_source=1"));
        assert!(url.contains("utm_campaign=example"));
        assert!(url.contains("utm_medium=email"));
        assert!(url.contains("utm_content=test"));
        assert!(!url.contains("utm_nooverride"));
    }

    #[test]
    fn test_empty_labels_are_omitted() {
        let tags = CampaignTags {
            source: "AB",
            campaign: Some("Spring"),
            medium: None,
            content: Some(""),
        };
        let url = build_redirect_url("https://example.com/landing", Some(&tags), &[], false).unwrap();

        assert_eq!(value_of(&url, UTM_SOURCE).as_deref(), Some("AB"));
        assert_eq!(value_of(&url, UTM_CAMPAIGN).as_deref(), Some("spring"));
        assert!(!url.contains("utm_medium"));
        assert!(!url.contains("utm_content"));
    }

    #[test]
    fn test_non_tracking_passes_caller_params_only() {
        let caller = vec![("test".to_string(), "param".to_string())];
        let url = build_redirect_url("http://www.example.com", None, &caller, true).unwrap();

        assert!(url.contains("test=param"));
        assert!(!url.contains("utm_"));
    }

    #[test]
    fn test_nooverride_flag() {
        let url =
            build_redirect_url("http://www.example.com", Some(&example_tags()), &[], true).unwrap();
        assert_eq!(value_of(&url, UTM_NOOVERRIDE).as_deref(), Some("1"));
    }

    #[test]
    fn test_caller_params_override_tracking_params() {
        let caller = vec![("utm_medium".to_string(), "banner".to_string())];
        let url = build_redirect_url("http://www.example.com", Some(&example_tags()), &caller, false)
            .unwrap();

        assert_eq!(value_of(&url, UTM_MEDIUM).as_deref(), Some("banner"));
        assert_eq!(
            query_of(&url).iter().filter(|(k, _)| k == UTM_MEDIUM).count(),
            1
        );
    }

    #[test]
    fn test_existing_params_preserved_unless_overridden() {
        let url = build_redirect_url(
            "https://example.com/path/page?ref=home&utm_source=old",
            Some(&example_tags()),
            &[],
            false,
        )
        .unwrap();

        assert_eq!(value_of(&url, "ref").as_deref(), Some("home"));
        assert_eq!(value_of(&url, UTM_SOURCE).as_deref(), Some("1"));
        assert!(url.starts_with("https://example.com/path/page?"));
    }

    #[test]
    fn test_each_key_appears_once() {
        let url = add_query_params(
            "https://example.com/?a=1&a=2&b=3",
            &[("b".to_string(), "4".to_string())],
        )
        .unwrap();

        let pairs = query_of(&url);
        assert_eq!(pairs.len(), 2);
        assert_eq!(value_of(&url, "a").as_deref(), Some("2"));
        assert_eq!(value_of(&url, "b").as_deref(), Some("4"));
    }

    #[test]
    fn test_duplicate_keys_collapse_without_merged_params() {
        let url = add_query_params("https://example.com/?a=1&a=2", &[]).unwrap();
        assert_eq!(url, "https://example.com/?a=2");

        let url = build_redirect_url("https://example.com/?x=1&y=2&x=3", None, &[], false).unwrap();
        assert_eq!(url, "https://example.com/?x=3&y=2");
    }

    #[test]
    fn test_fragment_and_port_untouched() {
        let url = add_query_params(
            "https://example.com:8443/docs#intro",
            &[("lang".to_string(), "en".to_string())],
        )
        .unwrap();

        assert_eq!(url, "https://example.com:8443/docs?lang=en#intro");
    }

    #[test]
    fn test_no_params_leaves_url_alone() {
        let url = add_query_params("https://example.com/a?x=1", &[("y".to_string(), String::new())])
            .unwrap();
        assert_eq!(url, "https://example.com/a?x=1");
    }

    #[test]
    fn test_invalid_destination() {
        let result = add_query_params("not a url", &[]);
        assert!(matches!(result, Err(TrackingUrlError::InvalidDestination(_))));
    }
}
