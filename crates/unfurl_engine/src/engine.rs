use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use url::Url;

use crate::extract::{MetaTagExtractor, MetadataExtractor};
use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::provider::{OEmbedEndpoints, ProviderResolver};
use crate::target::{check_resolved_host, validate_target, InvalidTarget, TargetUrl};
use crate::{decode_html, FetchError, FetchOutput, UnfurlResult};

#[derive(Debug, Clone)]
pub struct UnfurlSettings {
    pub fetch: FetchSettings,
    /// Wall-clock bound on the whole generic fetch, body included.
    pub fetch_timeout: Duration,
    pub endpoints: OEmbedEndpoints,
    /// Resolve hostnames and reject those pointing at blocked addresses.
    pub resolve_dns: bool,
}

impl Default for UnfurlSettings {
    fn default() -> Self {
        Self {
            fetch: FetchSettings::default(),
            fetch_timeout: Duration::from_secs(7),
            endpoints: OEmbedEndpoints::default(),
            resolve_dns: false,
        }
    }
}

/// Link-preview pipeline: validate, try a provider, fetch, re-validate, extract.
///
/// Stateless between calls; one instance can serve concurrent requests.
pub struct Unfurler {
    fetcher: Arc<dyn Fetcher>,
    providers: ProviderResolver,
    extractor: Box<dyn MetadataExtractor>,
    fetch_timeout: Duration,
    resolve_dns: bool,
}

impl Unfurler {
    pub fn new(settings: UnfurlSettings) -> Result<Self, FetchError> {
        let fetcher = Arc::new(ReqwestFetcher::new(settings.fetch.clone()));
        Self::with_fetcher(settings, fetcher)
    }

    /// Same pipeline over a caller-supplied fetcher.
    pub fn with_fetcher(settings: UnfurlSettings, fetcher: Arc<dyn Fetcher>) -> Result<Self, FetchError> {
        let providers = ProviderResolver::new(
            settings.endpoints,
            settings.fetch.user_agent,
            settings.fetch.request_timeout,
        )?;
        Ok(Self {
            fetcher,
            providers,
            extractor: Box::new(MetaTagExtractor),
            fetch_timeout: settings.fetch_timeout,
            resolve_dns: settings.resolve_dns,
        })
    }

    /// Preview card for `raw`.
    ///
    /// Only input validation can fail; every later problem degrades to
    /// [`UnfurlResult::minimal`].
    pub async fn unfurl(&self, raw: &str) -> Result<UnfurlResult, InvalidTarget> {
        let target = self.validate(raw).await?;

        if let Some(result) = self.providers.try_provider_preview(&target).await {
            return Ok(result);
        }

        let output = match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(target.as_url())).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                engine_warn!("Fetch of {} failed: {}", target, err);
                return Ok(UnfurlResult::minimal(target.as_str()));
            }
            Err(_) => {
                engine_warn!("Fetch of {} exceeded {:?}", target, self.fetch_timeout);
                return Ok(UnfurlResult::minimal(target.as_str()));
            }
        };

        Ok(self.finish(&target, output).await)
    }

    async fn validate(&self, raw: &str) -> Result<TargetUrl, InvalidTarget> {
        let target = validate_target(raw)?;
        if self.resolve_dns {
            check_resolved_host(&target).await?;
        }
        Ok(target)
    }

    async fn finish(&self, target: &TargetUrl, output: FetchOutput) -> UnfurlResult {
        let meta = &output.metadata;

        let final_url = match self.validate(&meta.final_url).await {
            Ok(final_target) => final_target.into_url(),
            Err(err) => {
                engine_warn!("{} redirected to unsafe {}: {}", target, meta.final_url, err);
                return UnfurlResult::minimal(target.as_str());
            }
        };

        if !meta.is_success() {
            engine_debug!("{} answered {}", final_url, meta.status);
            return UnfurlResult::minimal(final_url.as_str());
        }
        if !meta.is_html() {
            engine_debug!("{} is not HTML ({:?})", final_url, meta.content_type);
            return UnfurlResult::minimal(final_url.as_str());
        }

        self.extract(&output, &final_url)
    }

    fn extract(&self, output: &FetchOutput, final_url: &Url) -> UnfurlResult {
        let decoded = decode_html(&output.bytes, output.metadata.content_type.as_deref());
        if decoded.had_errors {
            engine_debug!("{} decoded lossily as {}", final_url, decoded.encoding_label);
        }
        self.extractor.extract(&decoded.html, final_url)
    }
}
