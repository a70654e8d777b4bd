use std::collections::HashSet;

use url::Url;

/// Canonical form of a URL, used only to detect duplicate links.
///
/// Scheme, host, path and query are lower-cased, a single trailing slash is
/// removed from the path, and the fragment is dropped. Default ports and
/// credentials do not participate. Input that does not parse as a URL is
/// compared as its trimmed, lower-cased literal.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let parsed = match Url::parse(trimmed) {
        Ok(parsed) => parsed,
        Err(_) => return trimmed.to_lowercase(),
    };

    let mut normalized = format!("{}:", parsed.scheme());
    if let Some(host) = parsed.host_str() {
        normalized.push_str("//");
        normalized.push_str(host);
        if let Some(port) = parsed.port() {
            normalized.push_str(&format!(":{}", port));
        }
    }

    let path = parsed.path();
    normalized.push_str(path.strip_suffix('/').unwrap_or(path));

    if let Some(query) = parsed.query().filter(|q| !q.is_empty()) {
        normalized.push('?');
        normalized.push_str(query);
    }

    normalized.to_lowercase()
}

/// Trims, lower-cases and de-duplicates tags, dropping empty entries.
/// First-seen order is kept.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(tags.len());
    tags.iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Appends every incoming tag not already present (case-insensitive).
/// Returns whether anything was added.
pub fn merge_tags<S: AsRef<str>>(existing: &mut Vec<String>, incoming: &[S]) -> bool {
    let before = existing.len();
    for tag in normalize_tags(incoming) {
        if !existing.iter().any(|t| t.to_lowercase() == tag) {
            existing.push(tag);
        }
    }
    existing.len() != before
}

// Helper method for parsing comma-separated tags
pub fn parse_tags(tags: Option<String>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Trims a text field, mapping blank input to `None`.
pub fn trim_to_option(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_and_case_are_ignored() {
        assert_eq!(
            normalize_url("https://Example.com/path/"),
            normalize_url("https://example.com/path")
        );
        assert_eq!(
            normalize_url("https://example.com/"),
            normalize_url("HTTPS://EXAMPLE.COM")
        );
    }

    #[test]
    fn query_is_significant_fragment_is_not() {
        assert_ne!(
            normalize_url("https://example.com/path?x=1"),
            normalize_url("https://example.com/path?x=2")
        );
        assert_eq!(
            normalize_url("https://example.com/path#section"),
            "https://example.com/path"
        );
        assert_eq!(normalize_url("https://example.com/a?"), "https://example.com/a");
    }

    #[test]
    fn ports_and_whitespace() {
        assert_eq!(
            normalize_url("  http://example.com:80/a  "),
            "http://example.com/a"
        );
        assert_eq!(
            normalize_url("http://example.com:8080/a"),
            "http://example.com:8080/a"
        );
    }

    #[test]
    fn unparseable_input_falls_back_to_literal() {
        assert_eq!(normalize_url("  Not A URL  "), "not a url");
        assert_eq!(normalize_url("example.com/Page"), "example.com/page");
    }

    #[test]
    fn tags_are_cleaned() {
        let tags = normalize_tags(&[" Rust ", "rust", "", "  ", "Web"]);
        assert_eq!(tags, vec!["rust", "web"]);
    }

    #[test]
    fn merge_reports_changes() {
        let mut tags = vec!["a".to_string(), "b".to_string()];
        assert!(merge_tags(&mut tags, &["B", "c"]));
        assert_eq!(tags, vec!["a", "b", "c"]);
        assert!(!merge_tags(&mut tags, &["A", " c "]));
        assert!(!merge_tags::<&str>(&mut tags, &[]));
    }

    #[test]
    fn comma_separated_tags() {
        assert_eq!(
            parse_tags(Some("web, rust,,  ".to_string())),
            vec!["web", "rust"]
        );
        assert!(parse_tags(None).is_empty());
    }
}
