use async_trait::async_trait;

use crate::error::ClientResult;
use crate::model::{ChatReply, ChatRequest, JobId, MetricSnapshot, ReferenceRequest};

/// The three backend calls the engine depends on.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// `POST /chat` (or `/chat_demo`).
    async fn chat(&self, request: &ChatRequest) -> ClientResult<ChatReply>;

    /// `GET /metrics/{id}`.
    async fn fetch_metrics(&self, job_id: &JobId) -> ClientResult<MetricSnapshot>;

    /// `POST /ref_metric`.
    async fn submit_reference(&self, request: &ReferenceRequest) -> ClientResult<()>;

    fn backend_name(&self) -> &'static str;
}
