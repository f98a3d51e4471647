//! HTTP layer: request dispatch and status mapping.
//!
//! This is the ONLY place for status code handling. client/mod.rs never
//! interprets status codes. There is no retry here: user-initiated requests
//! surface their failure, and polling retries on its own schedule.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{ClientError, ClientResult};

use super::helpers::parse_error_body;

/// HTTP backend for making requests (holds reqwest client and base URL).
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
}

impl HttpBackend {
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ClientResult<T> {
        let response = self.send(self.client.get(url)).await?;
        decode(response).await
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> ClientResult<T> {
        let response = self.send(self.client.post(url).json(body)).await?;
        decode(response).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ClientResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "response received");

        if status.is_success() {
            return Ok(response);
        }

        let status_line = status_line(status);
        let body = response.text().await.unwrap_or_default();
        let detail = parse_error_body(&body, &status_line);

        Err(ClientError::Request {
            message: format!("HTTP {}: {}", status.as_u16(), detail),
            status: Some(status.as_u16()),
        })
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    let bytes = response.bytes().await?;
    let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        &bytes
    };
    serde_json::from_slice(bytes).map_err(|e| ClientError::InvalidResponse {
        message: format!("failed to parse response body: {}", e),
    })
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}
