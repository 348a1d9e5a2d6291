use serde::{Deserialize, Serialize};
use url::Url;

/// Normalized link-preview card.
///
/// Every field except `url` may be empty. `url` is the location the data was
/// produced from, or the requested URL when only the minimal shape is known.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnfurlResult {
    pub url: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub site_name: String,
}

impl UnfurlResult {
    /// Degraded card: the hostname (or the raw URL) as title, nothing else.
    pub fn minimal(url: &str) -> Self {
        let title = hostname_of(url).unwrap_or_else(|| url.to_string());
        Self {
            url: url.to_string(),
            title,
            ..Self::default()
        }
    }
}

/// Hostname of `url`, or `None` when it does not parse or has no host.
pub fn hostname_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .filter(|host| !host.is_empty())
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::{hostname_of, truncate_chars, UnfurlResult};

    #[test]
    fn minimal_uses_hostname_as_title() {
        let result = UnfurlResult::minimal("https://example.com/a/b?c=d");
        assert_eq!(result.url, "https://example.com/a/b?c=d");
        assert_eq!(result.title, "example.com");
        assert!(result.description.is_empty());
        assert!(result.image.is_empty());
        assert!(result.site_name.is_empty());
    }

    #[test]
    fn minimal_falls_back_to_raw_url() {
        let result = UnfurlResult::minimal("not a url");
        assert_eq!(result.title, "not a url");
    }

    #[test]
    fn hostname_of_keeps_ipv6_brackets() {
        assert_eq!(hostname_of("http://[2001:db8::1]/x").as_deref(), Some("[2001:db8::1]"));
        assert_eq!(hostname_of("mailto:someone@example.com"), None);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn serializes_with_snake_case_fields() {
        let json = serde_json::to_value(UnfurlResult::minimal("https://example.com")).unwrap();
        assert_eq!(json["site_name"], "");
        assert_eq!(json["title"], "example.com");
    }
}
