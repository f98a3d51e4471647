//! Scripted in-memory backend for tests and offline development.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::DashboardApi;
use crate::error::{ClientError, ClientResult};
use crate::model::{ChatReply, ChatRequest, JobId, JobStatus, MetricSnapshot, ReferenceRequest};

/// One scripted answer of `fetch_metrics`.
#[derive(Debug, Clone)]
pub enum FetchStep {
    Snapshot(MetricSnapshot),
    Fail(String),
    /// Resolve after `delay` (tokio time).
    Delayed(Duration, MetricSnapshot),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FakeCalls {
    pub chat: usize,
    pub fetch: usize,
    pub reference: usize,
}

impl FakeCalls {
    pub fn total(&self) -> usize {
        self.chat + self.fetch + self.reference
    }
}

#[derive(Debug, Default)]
struct FakeState {
    chat_outcomes: VecDeque<(Duration, Result<ChatReply, String>)>,
    next_id: u64,
    scripts: HashMap<JobId, VecDeque<FetchStep>>,
    fetches: HashMap<JobId, usize>,
    reference_failure: Option<String>,
    chat_requests: Vec<ChatRequest>,
    reference_requests: Vec<ReferenceRequest>,
    calls: FakeCalls,
}

/// Deterministic [`DashboardApi`] driven by per-job scripts.
///
/// The last scripted step of a job repeats forever; a job without a script
/// reports `status: new` with no metrics.
#[derive(Debug, Default)]
pub struct FakeDashboard {
    state: Mutex<FakeState>,
}

impl FakeDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_chat_reply(self, id: impl Into<JobId>, response: impl Into<String>) -> Self {
        self.with_delayed_chat_reply(id, response, Duration::ZERO)
    }

    /// Queue a chat reply that is only returned after `delay`.
    pub fn with_delayed_chat_reply(
        self,
        id: impl Into<JobId>,
        response: impl Into<String>,
        delay: Duration,
    ) -> Self {
        let reply = ChatReply {
            id: id.into(),
            response: response.into(),
            score: None,
            warning: false,
            source: String::new(),
        };
        self.state().chat_outcomes.push_back((delay, Ok(reply)));
        self
    }

    pub fn fail_chat(self, message: impl Into<String>) -> Self {
        self.state()
            .chat_outcomes
            .push_back((Duration::ZERO, Err(message.into())));
        self
    }

    pub fn fail_reference(self, message: impl Into<String>) -> Self {
        self.state().reference_failure = Some(message.into());
        self
    }

    pub fn with_script(self, job_id: impl Into<JobId>, steps: Vec<FetchStep>) -> Self {
        self.push_script(job_id, steps);
        self
    }

    /// Append steps to a job's script.
    pub fn push_script(&self, job_id: impl Into<JobId>, steps: Vec<FetchStep>) {
        self.state()
            .scripts
            .entry(job_id.into())
            .or_default()
            .extend(steps);
    }

    /// Drop whatever is left of a job's script (including the repeating last
    /// step) and start over with `steps`.
    pub fn replace_script(&self, job_id: impl Into<JobId>, steps: Vec<FetchStep>) {
        self.state()
            .scripts
            .insert(job_id.into(), steps.into_iter().collect());
    }

    pub fn calls(&self) -> FakeCalls {
        self.state().calls
    }

    pub fn fetches_for(&self, job_id: &JobId) -> usize {
        self.state().fetches.get(job_id).copied().unwrap_or(0)
    }

    pub fn last_chat_request(&self) -> Option<ChatRequest> {
        self.state().chat_requests.last().cloned()
    }

    pub fn reference_requests(&self) -> Vec<ReferenceRequest> {
        self.state().reference_requests.clone()
    }
}

#[async_trait]
impl DashboardApi for FakeDashboard {
    async fn chat(&self, request: &ChatRequest) -> ClientResult<ChatReply> {
        let (delay, outcome) = {
            let mut state = self.state();
            state.calls.chat += 1;
            state.chat_requests.push(request.clone());
            match state.chat_outcomes.pop_front() {
                Some(queued) => queued,
                None => {
                    state.next_id += 1;
                    let reply = ChatReply {
                        id: JobId::from(state.next_id),
                        response: format!("echo: {}", request.message),
                        score: None,
                        warning: false,
                        source: String::new(),
                    };
                    (Duration::ZERO, Ok(reply))
                }
            }
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome.map_err(ClientError::request)
    }

    async fn fetch_metrics(&self, job_id: &JobId) -> ClientResult<MetricSnapshot> {
        let step = {
            let mut state = self.state();
            state.calls.fetch += 1;
            *state.fetches.entry(job_id.clone()).or_default() += 1;
            match state.scripts.get_mut(job_id) {
                Some(script) if script.len() > 1 => script.pop_front(),
                Some(script) => script.front().cloned(),
                None => None,
            }
        };

        match step {
            Some(FetchStep::Snapshot(snapshot)) => Ok(snapshot),
            Some(FetchStep::Fail(message)) => Err(ClientError::Request {
                message,
                status: Some(500),
            }),
            Some(FetchStep::Delayed(delay, snapshot)) => {
                tokio::time::sleep(delay).await;
                Ok(snapshot)
            }
            None => Ok(MetricSnapshot::new(JobStatus::New)),
        }
    }

    async fn submit_reference(&self, request: &ReferenceRequest) -> ClientResult<()> {
        let mut state = self.state();
        state.calls.reference += 1;
        state.reference_requests.push(request.clone());
        match &state.reference_failure {
            Some(message) => Err(ClientError::request(message.clone())),
            None => Ok(()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}
