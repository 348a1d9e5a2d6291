#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use unfurl_engine::{FailureKind, FetchError, FetchMetadata, FetchOutput, Fetcher};
use url::Url;

/// Canned answer for [`ScriptedFetcher`].
#[derive(Debug, Clone)]
pub enum Script {
    Page {
        final_url: String,
        status: u16,
        content_type: Option<String>,
        body: String,
    },
    Fail(FailureKind),
}

impl Script {
    pub fn html(final_url: &str, body: &str) -> Self {
        Script::Page {
            final_url: final_url.to_string(),
            status: 200,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: body.to_string(),
        }
    }
}

/// In-memory fetcher that counts calls and replays one scripted answer.
pub struct ScriptedFetcher {
    script: Script,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn delayed(script: Script, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script,
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchOutput, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script {
            Script::Page {
                final_url,
                status,
                content_type,
                body,
            } => Ok(FetchOutput {
                bytes: body.as_bytes().to_vec(),
                metadata: FetchMetadata {
                    original_url: url.to_string(),
                    final_url: final_url.clone(),
                    status: *status,
                    redirect_count: usize::from(final_url != url.as_str()),
                    content_type: content_type.clone(),
                    byte_len: body.len() as u64,
                    truncated: false,
                },
            }),
            Script::Fail(kind) => Err(FetchError::new(kind.clone(), "scripted failure")),
        }
    }
}
