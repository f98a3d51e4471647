//! User-initiated requests: prompt submission and reference submission.
//!
//! Both validate input before touching the network and never retry.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::DashboardApi;
use crate::error::{ClientError, ClientResult};
use crate::model::{ChatReply, ChatRequest, JobId, Language, ReferenceRequest};

pub(crate) fn require_text(field: &'static str, text: &str) -> ClientResult<()> {
    if text.trim().is_empty() {
        return Err(ClientError::validation(field, "must not be empty"));
    }
    Ok(())
}

/// Issues the prompt-evaluation request.
#[derive(Clone)]
pub struct JobSubmitter {
    api: Arc<dyn DashboardApi>,
}

impl JobSubmitter {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self { api }
    }

    pub async fn submit(&self, prompt: &str, language: Language) -> ClientResult<ChatReply> {
        require_text("prompt", prompt)?;

        let request = ChatRequest {
            message: prompt.to_string(),
            language,
        };
        let reply = self.api.chat(&request).await.inspect_err(|e| {
            warn!(error = %e, backend = self.api.backend_name(), "prompt submission failed");
        })?;

        debug!(job_id = %reply.id, warning = reply.warning, "job created");
        Ok(reply)
    }
}

/// Issues the job-scoped request that adds reference-based metrics.
#[derive(Clone)]
pub struct ReferenceSubmitter {
    api: Arc<dyn DashboardApi>,
}

impl ReferenceSubmitter {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self { api }
    }

    pub async fn submit_reference(&self, job_id: &JobId, reference: &str) -> ClientResult<()> {
        require_text("reference", reference)?;

        let request = ReferenceRequest {
            log_id: job_id.clone(),
            reference: reference.to_string(),
        };
        self.api.submit_reference(&request).await.inspect_err(|e| {
            warn!(error = %e, job_id = %job_id, "reference submission failed");
        })?;

        debug!(job_id = %job_id, "reference accepted");
        Ok(())
    }
}
