use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::preview::truncate_chars;
use crate::UnfurlResult;

/// Characters of decoded HTML considered for metadata.
pub const MAX_HTML_CHARS: usize = 200_000;
/// Characters kept from a `<title>` element.
pub const MAX_TITLE_CHARS: usize = 200;

const TITLE_KEYS: &[&str] = &["og:title", "twitter:title"];
const DESCRIPTION_KEYS: &[&str] = &["og:description", "twitter:description", "description"];
const IMAGE_KEYS: &[&str] = &["og:image", "twitter:image"];
const SITE_NAME_KEYS: &[&str] = &["og:site_name"];

pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, html: &str, final_url: &Url) -> UnfurlResult;
}

/// Open Graph / Twitter Card / `<title>` extractor.
///
/// Tokenizes the bounded prefix with `scraper`, so attribute order, quoting
/// style and entity encoding inside `<meta>` tags do not matter. Each field
/// falls back independently; nothing here fails.
#[derive(Debug, Default)]
pub struct MetaTagExtractor;

impl MetadataExtractor for MetaTagExtractor {
    fn extract(&self, html: &str, final_url: &Url) -> UnfurlResult {
        let doc = Html::parse_document(truncate_chars(html, MAX_HTML_CHARS));
        let metas = collect_meta(&doc);

        let title = pick_meta(&metas, TITLE_KEYS)
            .or_else(|| document_title(&doc))
            .or_else(|| final_url.host_str().map(str::to_string))
            .unwrap_or_default();
        let description = pick_meta(&metas, DESCRIPTION_KEYS).unwrap_or_default();
        let image = pick_meta(&metas, IMAGE_KEYS)
            .and_then(|raw| final_url.join(&raw).ok())
            .filter(|image| matches!(image.scheme(), "http" | "https"))
            .map(String::from)
            .unwrap_or_default();
        let site_name = pick_meta(&metas, SITE_NAME_KEYS).unwrap_or_default();

        UnfurlResult {
            url: final_url.to_string(),
            title,
            description,
            image,
            site_name,
        }
    }
}

struct MetaTag<'a> {
    keys: [Option<&'a str>; 2],
    content: &'a str,
}

fn collect_meta(doc: &Html) -> Vec<MetaTag<'_>> {
    let Ok(sel) = Selector::parse("meta") else {
        return Vec::new();
    };
    doc.select(&sel)
        .filter_map(|el| {
            let el = el.value();
            let content = el.attr("content")?.trim();
            if content.is_empty() {
                return None;
            }
            Some(MetaTag {
                keys: [el.attr("property"), el.attr("name")],
                content,
            })
        })
        .collect()
}

/// First non-empty content for the earliest key in `keys` that appears at all.
fn pick_meta(metas: &[MetaTag<'_>], keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        metas
            .iter()
            .find(|meta| {
                meta.keys
                    .iter()
                    .flatten()
                    .any(|k| k.trim().eq_ignore_ascii_case(key))
            })
            .map(|meta| meta.content.to_string())
    })
}

fn document_title(doc: &Html) -> Option<String> {
    let sel = Selector::parse("title").ok()?;
    doc.select(&sel)
        .next()
        .map(text_of)
        .map(|t| truncate_chars(t.trim(), MAX_TITLE_CHARS).trim_end().to_string())
        .filter(|t| !t.is_empty())
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/post").unwrap()
    }

    #[test]
    fn attribute_order_does_not_matter() {
        let html = r#"<meta content="Swapped" property="og:title"><meta property="og:description" content="Desc">"#;
        let result = MetaTagExtractor.extract(html, &base());
        assert_eq!(result.title, "Swapped");
        assert_eq!(result.description, "Desc");
    }

    #[test]
    fn name_attribute_is_accepted_for_any_key() {
        let html = r#"<meta name="twitter:title" content="Tweet"><meta name="description" content=" Plain ">"#;
        let result = MetaTagExtractor.extract(html, &base());
        assert_eq!(result.title, "Tweet");
        assert_eq!(result.description, "Plain");
    }

    #[test]
    fn og_keys_win_over_twitter_keys_regardless_of_position() {
        let html = r#"<meta name="twitter:image" content="/tw.png"><meta property="og:image" content="/og.png">"#;
        let result = MetaTagExtractor.extract(html, &base());
        assert_eq!(result.image, "https://example.com/og.png");
    }

    #[test]
    fn empty_content_falls_through() {
        let html = r#"<meta property="og:title" content="  "><title>Doc Title</title>"#;
        let result = MetaTagExtractor.extract(html, &base());
        assert_eq!(result.title, "Doc Title");
    }

    #[test]
    fn title_element_is_capped() {
        let long = "x".repeat(MAX_TITLE_CHARS + 50);
        let html = format!("<title>{long}</title>");
        let result = MetaTagExtractor.extract(&html, &base());
        assert_eq!(result.title.chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn hostname_is_last_resort_title() {
        let result = MetaTagExtractor.extract("<p>nothing here</p>", &base());
        assert_eq!(result.title, "example.com");
        assert_eq!(result.url, "https://example.com/post");
        assert!(result.description.is_empty());
        assert!(result.image.is_empty());
        assert!(result.site_name.is_empty());
    }

    #[test]
    fn unresolvable_image_is_dropped() {
        let html = r#"<meta property="og:image" content="http://[bad">"#;
        let result = MetaTagExtractor.extract(html, &base());
        assert_eq!(result.image, "");
    }

    #[test]
    fn non_http_image_schemes_are_dropped() {
        for raw in ["javascript:alert(1)", "data:image/png;base64,AAAA", "file:///etc/passwd"] {
            let html = format!(r#"<meta property="og:image" content="{raw}">"#);
            let result = MetaTagExtractor.extract(&html, &base());
            assert_eq!(result.image, "", "{raw}");
        }
    }

    #[test]
    fn entities_in_content_are_decoded() {
        let html = r#"<meta property="og:title" content="Fish &amp; Chips"><meta property="og:site_name" content="Caf&eacute;">"#;
        let result = MetaTagExtractor.extract(html, &base());
        assert_eq!(result.title, "Fish & Chips");
        assert_eq!(result.site_name, "Café");
    }

    #[test]
    fn tags_beyond_the_scan_window_are_ignored() {
        let padding = "a".repeat(MAX_HTML_CHARS);
        let html = format!("<p>{padding}</p><meta property=\"og:title\" content=\"Late\">");
        let result = MetaTagExtractor.extract(&html, &base());
        assert_eq!(result.title, "example.com");
    }
}
