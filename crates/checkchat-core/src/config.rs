//! Client configuration: environment, builder and the YAML dashboard file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::model::Language;
use crate::registry::{MetricRegistry, ThresholdOverrides};

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

/// Connection and polling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the dashboard API (the `/api` prefix included).
    #[serde(default = "default_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Delay between two metric polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Language the answer should be generated in.
    #[serde(default)]
    pub language: Language,

    /// Use the canned-answer demo endpoint.
    #[serde(default)]
    pub demo: bool,
}

fn default_url() -> String {
    "http://127.0.0.1:5000/api".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout(),
            poll_interval_ms: default_poll_interval_ms(),
            language: Language::default(),
            demo: false,
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `CHECKCHAT_URL` | API base URL |
    /// | `CHECKCHAT_TIMEOUT` | Request timeout in seconds |
    /// | `CHECKCHAT_POLL_INTERVAL_MS` | Poll interval in milliseconds |
    /// | `CHECKCHAT_LANGUAGE` | `en` or `ja` |
    /// | `CHECKCHAT_DEMO` | Use the demo chat endpoint |
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("CHECKCHAT_URL").unwrap_or_else(|_| default_url()),
            timeout_secs: std::env::var("CHECKCHAT_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or_else(default_timeout),
            poll_interval_ms: std::env::var("CHECKCHAT_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or_else(default_poll_interval_ms),
            language: std::env::var("CHECKCHAT_LANGUAGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            demo: std::env::var("CHECKCHAT_DEMO")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// Set the base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis().max(1) as u64;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_demo(mut self, demo: bool) -> Self {
        self.demo = demo;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reject settings that would make every request time out at once or
    /// turn polling into a busy loop.
    pub fn validate(&self) -> ClientResult<()> {
        if self.timeout_secs == 0 {
            return Err(ClientError::config("timeout_secs must be at least 1"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ClientError::config("poll_interval_ms must be at least 1"));
        }
        Ok(())
    }
}

/// On-disk dashboard file (`checkchat.yaml`).
///
/// ```yaml
/// version: 1
/// client:
///   url: http://127.0.0.1:5000/api
///   poll_interval_ms: 500
/// thresholds:
///   response_toxicity: { threshold: 0.3, direction: low }
///   request_readability: null
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardFile {
    pub version: u32,
    #[serde(default)]
    pub client: Option<ClientConfig>,
    #[serde(default)]
    pub thresholds: ThresholdOverrides,
}

impl DashboardFile {
    pub fn parse(raw: &str) -> ClientResult<Self> {
        let file: DashboardFile = serde_yaml::from_str(raw)
            .map_err(|e| ClientError::config(format!("failed to parse YAML: {}", e)))?;
        if file.version != SUPPORTED_CONFIG_VERSION {
            return Err(ClientError::config(format!(
                "unsupported config version {} (supported: {})",
                file.version, SUPPORTED_CONFIG_VERSION
            )));
        }
        if let Some(client) = &file.client {
            client.validate()?;
        }
        Ok(file)
    }

    /// The built-in registry with this file's overrides applied.
    pub fn registry(&self) -> ClientResult<MetricRegistry> {
        MetricRegistry::default().with_overrides(&self.thresholds)
    }
}

pub fn load_dashboard_file(path: &Path) -> ClientResult<DashboardFile> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ClientError::config(format!("failed to read config {}: {}", path.display(), e))
    })?;
    DashboardFile::parse(&raw)
}
