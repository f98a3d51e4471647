//! Per-job state machine tying submission, polling and projection together.
//!
//! ```text
//! Created -> PollingBase -> BaseDone -> [PollingReference -> ReferenceDone]*
//! ```
//!
//! A new submission replaces the current job outright; the old job's poll is
//! cancelled and any of its late snapshots are ignored.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::info;

use crate::api::DashboardApi;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::model::{ChatReply, Job, JobId, Language, MetricSnapshot};
use crate::poller::{MetricPoller, PollObserver, PollTag};
use crate::projector::{Projection, ResultProjector};
use crate::registry::MetricRegistry;
use crate::submit::{require_text, JobSubmitter, ReferenceSubmitter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Created,
    PollingBase,
    BaseDone,
    PollingReference,
    ReferenceDone,
}

impl JobPhase {
    pub fn is_polling(&self) -> bool {
        matches!(self, Self::PollingBase | Self::PollingReference)
    }

    /// A reference can only be attached once the base metrics are done.
    pub fn accepts_reference(&self) -> bool {
        matches!(self, Self::BaseDone | Self::ReferenceDone)
    }

    fn after_terminal(self) -> Self {
        match self {
            Self::PollingBase => Self::BaseDone,
            Self::PollingReference => Self::ReferenceDone,
            other => other,
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::PollingBase => "polling_base",
            Self::BaseDone => "base_done",
            Self::PollingReference => "polling_reference",
            Self::ReferenceDone => "reference_done",
        })
    }
}

/// What the view receives after every accepted snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobUpdate {
    pub job_id: JobId,
    pub phase: JobPhase,
    /// Last update of a polling cycle.
    pub terminal: bool,
    pub projection: Projection,
}

pub trait EvalObserver: Send + Sync {
    fn on_update(&self, update: &JobUpdate);
}

#[derive(Debug)]
struct ControllerState {
    job: Job,
    phase: JobPhase,
}

impl ControllerState {
    fn created(job_id: JobId) -> Self {
        Self {
            job: Job::new(job_id),
            phase: JobPhase::Created,
        }
    }

    fn transition(&mut self, next: JobPhase) {
        if next != self.phase {
            info!(job_id = %self.job.id, from = %self.phase, to = %next, "job phase changed");
            self.phase = next;
        }
    }
}

type SharedState = Arc<Mutex<Option<ControllerState>>>;

fn lock_state(state: &Mutex<Option<ControllerState>>) -> MutexGuard<'_, Option<ControllerState>> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Bridges poller callbacks into the controller's job and the view.
struct Tracker {
    state: SharedState,
    projector: ResultProjector,
    view: Arc<dyn EvalObserver>,
}

impl Tracker {
    fn update(&self, tag: &PollTag, snapshot: &MetricSnapshot, terminal: bool) -> Option<JobUpdate> {
        let mut guard = lock_state(&self.state);
        let state = guard.as_mut().filter(|s| s.job.id == tag.job_id)?;

        state.job.apply(snapshot);
        if terminal {
            let next = state.phase.after_terminal();
            state.transition(next);
        }

        Some(JobUpdate {
            job_id: state.job.id.clone(),
            phase: state.phase,
            terminal,
            projection: self.projector.project(&state.job.snapshot()),
        })
    }
}

impl PollObserver for Tracker {
    fn on_snapshot(&self, tag: &PollTag, snapshot: &MetricSnapshot) {
        // the done snapshot is forwarded by on_terminal
        let update = self.update(tag, snapshot, false);
        if snapshot.is_done() {
            return;
        }
        if let Some(update) = update {
            self.view.on_update(&update);
        }
    }

    fn on_terminal(&self, tag: &PollTag, snapshot: &MetricSnapshot) {
        if let Some(update) = self.update(tag, snapshot, true) {
            self.view.on_update(&update);
        }
    }
}

/// Holds at most one job and drives it through its phases.
pub struct EvalController {
    submitter: JobSubmitter,
    reference_submitter: ReferenceSubmitter,
    poller: MetricPoller,
    tracker: Arc<Tracker>,
    state: SharedState,
    /// Number of the newest submission. Held while switching the polled
    /// job, so switches happen in submission order.
    latest: Mutex<u64>,
}

impl EvalController {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        config: &ClientConfig,
        registry: MetricRegistry,
        view: Arc<dyn EvalObserver>,
    ) -> Self {
        let state: SharedState = Arc::new(Mutex::new(None));
        let tracker = Arc::new(Tracker {
            state: Arc::clone(&state),
            projector: ResultProjector::new(Arc::new(registry)),
            view,
        });
        Self {
            submitter: JobSubmitter::new(Arc::clone(&api)),
            reference_submitter: ReferenceSubmitter::new(Arc::clone(&api)),
            poller: MetricPoller::new(api, config.poll_interval()),
            tracker,
            state,
            latest: Mutex::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ControllerState>> {
        lock_state(&self.state)
    }

    fn lock_latest(&self) -> MutexGuard<'_, u64> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Submit a prompt; on success the returned job replaces the current one
    /// and its base metrics start polling.
    ///
    /// Submissions may overlap. Only the most recently started one takes
    /// over polling: a reply that arrives after a newer submission was
    /// started is returned to the caller but its job is not tracked.
    pub async fn submit(&self, prompt: &str, language: Language) -> ClientResult<ChatReply> {
        require_text("prompt", prompt)?;
        let ticket = {
            let mut latest = self.lock_latest();
            *latest += 1;
            *latest
        };

        let reply = self.submitter.submit(prompt, language).await?;

        let latest = self.lock_latest();
        if *latest == ticket {
            self.track(reply.id.clone());
        } else {
            info!(job_id = %reply.id, ticket, latest = *latest, "reply of a superseded submission; not polling");
        }
        Ok(reply)
    }

    /// Replace the current job with `job_id` and poll its base metrics.
    /// Callers hold the `latest` lock.
    fn track(&self, job_id: JobId) {
        {
            let mut guard = self.lock();
            if let Some(previous) = guard.as_ref() {
                info!(previous = %previous.job.id, next = %job_id, "job superseded");
            }
            let mut state = ControllerState::created(job_id.clone());
            state.transition(JobPhase::PollingBase);
            *guard = Some(state);
        }
        self.poller.start_polling(job_id, self.tracker.clone());
    }

    /// Attach a reference answer to the current job once its base metrics
    /// are done, then poll the reference-based metrics.
    pub async fn submit_reference(&self, job_id: &JobId, reference: &str) -> ClientResult<()> {
        if reference.trim().is_empty() {
            return Err(ClientError::validation("reference", "must not be empty"));
        }
        self.ensure_accepts_reference(job_id)?;

        self.reference_submitter
            .submit_reference(job_id, reference)
            .await?;

        let _latest = self.lock_latest();
        {
            let mut guard = self.lock();
            let Some(state) = guard.as_mut().filter(|s| &s.job.id == job_id) else {
                info!(job_id = %job_id, "job superseded while reference was submitted; not polling");
                return Ok(());
            };
            state.job.begin_cycle();
            state.transition(JobPhase::PollingReference);
        }

        self.poller
            .start_polling(job_id.clone(), self.tracker.clone());
        Ok(())
    }

    fn ensure_accepts_reference(&self, job_id: &JobId) -> ClientResult<()> {
        let guard = self.lock();
        match guard.as_ref() {
            Some(state) if &state.job.id == job_id => {
                if state.phase.accepts_reference() {
                    Ok(())
                } else {
                    Err(ClientError::NotReady {
                        job_id: job_id.clone(),
                        phase: state.phase,
                    })
                }
            }
            _ => Err(ClientError::validation(
                "job_id",
                format!("job {} is not the active job", job_id),
            )),
        }
    }

    /// Start tracking an existing job without submitting a prompt
    /// (e.g. reopening a job from its id). Polls its base metrics.
    pub fn attach(&self, job_id: JobId) {
        let mut latest = self.lock_latest();
        *latest += 1;
        self.track(job_id);
    }

    /// Whether the reference affordance should be enabled.
    pub fn can_submit_reference(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|s| s.phase.accepts_reference())
    }

    pub fn phase(&self) -> Option<JobPhase> {
        self.lock().as_ref().map(|s| s.phase)
    }

    pub fn current_job(&self) -> Option<Job> {
        self.lock().as_ref().map(|s| s.job.clone())
    }

    pub fn projection(&self) -> Option<Projection> {
        let job = self.current_job()?;
        Some(self.tracker.projector.project(&job.snapshot()))
    }

    pub fn registry(&self) -> &MetricRegistry {
        self.tracker.projector.registry()
    }

    pub fn active_poll(&self) -> Option<PollTag> {
        self.poller.active()
    }

    /// Stop polling. The job keeps its last known metrics.
    pub fn cancel(&self) -> Option<PollTag> {
        self.poller.cancel()
    }
}

impl Drop for EvalController {
    fn drop(&mut self) {
        self.poller.cancel();
    }
}
