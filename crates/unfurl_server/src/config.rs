use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use engine_logging::engine_info;
use serde::{Deserialize, Serialize};
use unfurl_engine::{FetchSettings, UnfurlSettings};

/// Server configuration, loaded from a RON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub fetch_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub redirect_limit: usize,
    pub max_body_bytes: u64,
    pub resolve_dns: bool,
    pub user_agent: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".into(),
            log_level: "info".into(),
            log_file: None,
            fetch_timeout_ms: 7_000,
            connect_timeout_ms: 5_000,
            redirect_limit: 10,
            max_body_bytes: 1024 * 1024,
            resolve_dns: false,
            user_agent: None,
        }
    }
}

impl ServerConfig {
    /// Load config from a RON file. Falls back to defaults if the file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            engine_info!("No config file found at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        ron::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Environment variables override file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("UNFURL_BIND") {
            self.bind = v;
        }
        if let Some(v) = lookup("UNFURL_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(ms) = lookup("UNFURL_FETCH_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.fetch_timeout_ms = ms;
        }
        if let Some(flag) = lookup("UNFURL_RESOLVE_DNS").and_then(|v| parse_flag(&v)) {
            self.resolve_dns = flag;
        }
    }

    pub fn unfurl_settings(&self) -> UnfurlSettings {
        let defaults = FetchSettings::default();
        let fetch_timeout = Duration::from_millis(self.fetch_timeout_ms);
        UnfurlSettings {
            fetch: FetchSettings {
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
                request_timeout: fetch_timeout,
                redirect_limit: self.redirect_limit,
                max_bytes: self.max_body_bytes,
                user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
                accept_language: defaults.accept_language,
            },
            fetch_timeout,
            resolve_dns: self.resolve_dns,
            ..UnfurlSettings::default()
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
