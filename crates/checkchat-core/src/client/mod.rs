//! Dashboard client: reqwest implementation of [`DashboardApi`].
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::api::DashboardApi;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::model::{ChatReply, ChatRequest, JobId, MetricSnapshot, ReferenceAck, ReferenceRequest};

mod helpers;
mod http;

use helpers::{endpoint, endpoint_with_segment};
use http::HttpBackend;

pub const CLIENT_USER_AGENT: &str = concat!("checkchat/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the dashboard API.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    http: HttpBackend,
    demo: bool,
}

impl DashboardClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(default_headers)
            .build()
            .map_err(|e| ClientError::config(format!("failed to create HTTP client: {}", e)))?;

        let base_url = config.url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::config("dashboard URL must not be empty"));
        }
        reqwest::Url::parse(&base_url)
            .map_err(|e| ClientError::config(format!("invalid dashboard URL {}: {}", base_url, e)))?;

        Ok(Self {
            http: HttpBackend { client, base_url },
            demo: config.demo,
        })
    }

    pub fn from_env() -> ClientResult<Self> {
        Self::new(&ClientConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.http.base_url
    }

    pub fn is_demo(&self) -> bool {
        self.demo
    }

    fn chat_url(&self) -> String {
        let path = if self.demo { "chat_demo" } else { "chat" };
        endpoint(&self.http.base_url, path)
    }

    fn metrics_url(&self, job_id: &JobId) -> ClientResult<String> {
        endpoint_with_segment(&self.http.base_url, "metrics", job_id.as_str())
    }

    fn reference_url(&self) -> String {
        endpoint(&self.http.base_url, "ref_metric")
    }
}

#[async_trait]
impl DashboardApi for DashboardClient {
    async fn chat(&self, request: &ChatRequest) -> ClientResult<ChatReply> {
        let url = self.chat_url();
        debug!(url = %url, language = %request.language, "submitting prompt");
        self.http.post_json(&url, request).await
    }

    async fn fetch_metrics(&self, job_id: &JobId) -> ClientResult<MetricSnapshot> {
        let url = self.metrics_url(job_id)?;
        debug!(url = %url, "fetching metrics");
        self.http.get_json(&url).await
    }

    async fn submit_reference(&self, request: &ReferenceRequest) -> ClientResult<()> {
        let url = self.reference_url();
        debug!(url = %url, job_id = %request.log_id, "submitting reference");
        let ack: ReferenceAck = self.http.post_json(&url, request).await?;
        if !ack.success {
            return Err(ClientError::request(format!(
                "backend rejected reference for job {}",
                request.log_id
            )));
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
