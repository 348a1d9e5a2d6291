//! Unfurl engine: SSRF-aware link previews.
mod decode;
mod engine;
mod extract;
mod fetch;
mod preview;
mod provider;
mod target;
mod types;

pub use decode::{decode_html, DecodedHtml};
pub use engine::{UnfurlSettings, Unfurler};
pub use extract::{MetaTagExtractor, MetadataExtractor, MAX_HTML_CHARS, MAX_TITLE_CHARS};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher, BROWSER_USER_AGENT};
pub use preview::{hostname_of, UnfurlResult};
pub use provider::{
    match_provider, parse_oembed, youtube_video_id, OEmbedEndpoints, Provider, ProviderMatch,
    ProviderResolver,
};
pub use target::{check_resolved_host, is_blocked_ip, validate_target, InvalidTarget, TargetUrl};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput};
