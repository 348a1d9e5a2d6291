//! oEmbed shortcuts for platforms whose pages are useless to scrape.
//!
//! A provider lookup never fails loudly: any transport, status or shape
//! problem yields `None` and the caller falls back to the generic fetch.

use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use reqwest::header::{ACCEPT, CACHE_CONTROL, USER_AGENT};
use serde_json::Value;
use url::Url;

use crate::{FailureKind, FetchError, TargetUrl, UnfurlResult};

const YOUTUBE_DOMAINS: &[&str] = &["youtube.com", "youtu.be", "m.youtube.com"];
const TIKTOK_DOMAINS: &[&str] = &["tiktok.com", "m.tiktok.com"];
const INSTAGRAM_DOMAINS: &[&str] = &["instagram.com"];
const YOUTUBE_ID_MARKERS: &[&str] = &["shorts", "live", "embed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    YouTube,
    TikTok,
    Instagram,
}

impl Provider {
    pub fn site_name(self) -> &'static str {
        match self {
            Provider::YouTube => "YouTube",
            Provider::TikTok => "TikTok",
            Provider::Instagram => "Instagram",
        }
    }

    fn domains(self) -> &'static [&'static str] {
        match self {
            Provider::YouTube => YOUTUBE_DOMAINS,
            Provider::TikTok => TIKTOK_DOMAINS,
            Provider::Instagram => INSTAGRAM_DOMAINS,
        }
    }
}

/// Result of hostname inspection. The payload is the URL handed to the
/// provider's oEmbed endpoint, canonicalized where the provider allows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderMatch {
    None,
    YouTube(String),
    TikTok(String),
    Instagram(String),
}

impl ProviderMatch {
    pub fn provider(&self) -> Option<Provider> {
        match self {
            ProviderMatch::None => None,
            ProviderMatch::YouTube(_) => Some(Provider::YouTube),
            ProviderMatch::TikTok(_) => Some(Provider::TikTok),
            ProviderMatch::Instagram(_) => Some(Provider::Instagram),
        }
    }

    pub fn oembed_target(&self) -> Option<&str> {
        match self {
            ProviderMatch::None => None,
            ProviderMatch::YouTube(target)
            | ProviderMatch::TikTok(target)
            | ProviderMatch::Instagram(target) => Some(target),
        }
    }
}

/// Classify `url` by hostname. YouTube URLs are rewritten to `watch?v=<id>`
/// when an id can be found; the others pass through untouched.
pub fn match_provider(url: &Url) -> ProviderMatch {
    let Some(host) = url.host_str() else {
        return ProviderMatch::None;
    };

    if host_is(host, Provider::YouTube.domains()) {
        let canonical = youtube_video_id(url)
            .and_then(|id| canonical_youtube_url(&id))
            .unwrap_or_else(|| url.to_string());
        return ProviderMatch::YouTube(canonical);
    }
    if host_is(host, Provider::TikTok.domains()) {
        return ProviderMatch::TikTok(url.to_string());
    }
    if host_is(host, Provider::Instagram.domains()) {
        return ProviderMatch::Instagram(url.to_string());
    }
    ProviderMatch::None
}

/// Suffix match on a `www.`-stripped, lowercased host.
fn host_is(host: &str, domains: &[&str]) -> bool {
    let host = host.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    domains.iter().any(|domain| {
        host == *domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// Video id from `youtu.be/<id>`, `watch?v=<id>` or `/{shorts,live,embed}/<id>`.
pub fn youtube_video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let mut segments = url
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|segment| !segment.is_empty());

    if host == "youtu.be" {
        return segments.next().map(str::to_string);
    }
    if !host_is(host, &["youtube.com"]) {
        return None;
    }

    if let Some((_, v)) = url.query_pairs().find(|(key, value)| key == "v" && !value.is_empty()) {
        return Some(v.into_owned());
    }

    let segments: Vec<&str> = segments.collect();
    segments
        .iter()
        .position(|segment| YOUTUBE_ID_MARKERS.contains(segment))
        .and_then(|idx| segments.get(idx + 1))
        .map(|id| id.to_string())
}

fn canonical_youtube_url(id: &str) -> Option<String> {
    Url::parse_with_params("https://www.youtube.com/watch", &[("v", id)])
        .ok()
        .map(String::from)
}

const YOUTUBE_OEMBED: &str = "https://www.youtube.com/oembed";
const TIKTOK_OEMBED: &str = "https://www.tiktok.com/oembed";
const INSTAGRAM_OEMBED: &str = "https://www.instagram.com/oembed/";

/// oEmbed endpoint per provider. Overridable so deployments can route
/// through a proxy and tests can point at a mock server.
///
/// Endpoints are parsed when a query is built; an unparsable one counts as
/// a provider failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OEmbedEndpoints {
    pub youtube: String,
    pub tiktok: String,
    pub instagram: String,
}

impl Default for OEmbedEndpoints {
    fn default() -> Self {
        Self {
            youtube: YOUTUBE_OEMBED.to_string(),
            tiktok: TIKTOK_OEMBED.to_string(),
            instagram: INSTAGRAM_OEMBED.to_string(),
        }
    }
}

impl OEmbedEndpoints {
    /// Same endpoints rooted at `base` (scheme, host, port), keeping the
    /// default paths.
    pub fn rooted_at(base: &Url) -> Self {
        let reroot = |endpoint: &str| {
            Url::parse(endpoint)
                .and_then(|url| base.join(url.path()))
                .map(String::from)
                .unwrap_or_else(|_| endpoint.to_string())
        };
        Self {
            youtube: reroot(YOUTUBE_OEMBED),
            tiktok: reroot(TIKTOK_OEMBED),
            instagram: reroot(INSTAGRAM_OEMBED),
        }
    }

    /// Full query URL for the given match, or `None` for [`ProviderMatch::None`]
    /// and for an endpoint that does not parse.
    pub fn request_url(&self, matched: &ProviderMatch) -> Option<Url> {
        let provider = matched.provider()?;
        let target = matched.oembed_target()?;
        let endpoint = match provider {
            Provider::YouTube => &self.youtube,
            Provider::TikTok => &self.tiktok,
            Provider::Instagram => &self.instagram,
        };
        let mut endpoint = Url::parse(endpoint).ok()?;
        {
            let mut query = endpoint.query_pairs_mut();
            if provider == Provider::YouTube {
                query.append_pair("format", "json");
            }
            query.append_pair("url", target);
        }
        Some(endpoint)
    }
}

#[derive(Debug, Clone)]
pub struct ProviderResolver {
    client: reqwest::Client,
    endpoints: OEmbedEndpoints,
    user_agent: String,
}

impl ProviderResolver {
    pub fn new(
        endpoints: OEmbedEndpoints,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Client, err.to_string()))?;
        Ok(Self {
            client,
            endpoints,
            user_agent: user_agent.into(),
        })
    }

    /// Preview from the matching provider's oEmbed endpoint, if any.
    ///
    /// Single attempt, no retries, no caching.
    pub async fn try_provider_preview(&self, target: &TargetUrl) -> Option<UnfurlResult> {
        let matched = match_provider(target.as_url());
        let provider = matched.provider()?;
        let request_url = self.endpoints.request_url(&matched)?;
        engine_debug!("{} matched {}; querying {}", target, provider.site_name(), request_url);

        let response = match self
            .client
            .get(request_url)
            .header(USER_AGENT, self.user_agent.as_str())
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                engine_warn!("{} oEmbed request failed for {}: {}", provider.site_name(), target, err);
                return None;
            }
        };

        if !response.status().is_success() {
            engine_debug!(
                "{} oEmbed returned {} for {}",
                provider.site_name(),
                response.status(),
                target
            );
            return None;
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                engine_warn!("{} oEmbed body unreadable for {}: {}", provider.site_name(), target, err);
                return None;
            }
        };

        let parsed = serde_json::from_slice::<Value>(&body)
            .ok()
            .and_then(|json| parse_oembed(&json, provider, target));
        if parsed.is_none() {
            engine_debug!("{} oEmbed payload rejected for {}", provider.site_name(), target);
        }
        parsed
    }
}

/// Map an oEmbed document onto the card shape. Requires a JSON object with a
/// string `title`; `thumbnail_url` is optional.
pub fn parse_oembed(json: &Value, provider: Provider, target: &TargetUrl) -> Option<UnfurlResult> {
    let object = json.as_object()?;
    let title = object.get("title")?.as_str()?;
    let image = object
        .get("thumbnail_url")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Some(UnfurlResult {
        url: target.to_string(),
        title: title.to_string(),
        description: String::new(),
        image: image.to_string(),
        site_name: provider.site_name().to_string(),
    })
}
