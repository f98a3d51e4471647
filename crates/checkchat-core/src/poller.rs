//! Metric polling: one cancellable loop per job, at most one alive.
//!
//! Every call to [`MetricPoller::start_polling`] cancels the live session
//! (if any) and spawns a new one tagged with a fresh [`PollTag`]. A fetch
//! that resolves after its session was superseded is dropped: delivery
//! re-checks the tag under the slot lock, so observers never see a stale
//! snapshot.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::DashboardApi;
use crate::model::{JobId, MetricSnapshot};

/// Identifies one polling cycle: the job it belongs to and a
/// poller-wide sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PollTag {
    pub job_id: JobId,
    pub cycle: u64,
}

impl fmt::Display for PollTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.job_id, self.cycle)
    }
}

/// Receives the snapshots of a polling cycle.
///
/// Callbacks run while the poller's slot is locked; they must not call back
/// into the [`MetricPoller`].
pub trait PollObserver: Send + Sync {
    fn on_snapshot(&self, tag: &PollTag, snapshot: &MetricSnapshot);

    /// Called exactly once, right after the `on_snapshot` of the first
    /// snapshot whose status is `done`.
    fn on_terminal(&self, tag: &PollTag, snapshot: &MetricSnapshot);
}

/// The live polling session. Owning its token is what makes it cancellable.
#[derive(Debug)]
struct PollSession {
    tag: PollTag,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct Slot {
    active: Option<PollSession>,
    cycles: u64,
}

impl Slot {
    fn is_current(&self, tag: &PollTag) -> bool {
        self.active.as_ref().is_some_and(|s| &s.tag == tag)
    }
}

enum Delivery {
    Continue,
    Terminal,
    Stale,
}

/// Polls `GET /metrics/{id}` until the job reports `done`.
#[derive(Clone)]
pub struct MetricPoller {
    api: Arc<dyn DashboardApi>,
    interval: Duration,
    slot: Arc<Mutex<Slot>>,
}

impl MetricPoller {
    pub fn new(api: Arc<dyn DashboardApi>, interval: Duration) -> Self {
        Self {
            api,
            interval: interval.max(Duration::from_millis(1)),
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        lock_slot(&self.slot)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start polling `job_id`, cancelling any session still alive.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_polling(&self, job_id: JobId, observer: Arc<dyn PollObserver>) -> PollTag {
        let mut slot = self.lock();
        if let Some(previous) = slot.active.take() {
            previous.token.cancel();
            debug!(tag = %previous.tag, "superseded polling session");
        }

        slot.cycles += 1;
        let tag = PollTag {
            job_id,
            cycle: slot.cycles,
        };
        let token = CancellationToken::new();
        slot.active = Some(PollSession {
            tag: tag.clone(),
            token: token.clone(),
        });

        debug!(tag = %tag, interval_ms = self.interval.as_millis(), "polling started");
        tokio::spawn(run_session(
            Arc::clone(&self.api),
            Arc::clone(&self.slot),
            tag.clone(),
            token,
            self.interval,
            observer,
        ));
        tag
    }

    /// Cancel the live session, if any.
    pub fn cancel(&self) -> Option<PollTag> {
        let session = self.lock().active.take()?;
        session.token.cancel();
        debug!(tag = %session.tag, "polling cancelled");
        Some(session.tag)
    }

    /// Tag of the live session.
    pub fn active(&self) -> Option<PollTag> {
        self.lock().active.as_ref().map(|s| s.tag.clone())
    }

    pub fn is_polling(&self) -> bool {
        self.lock().active.is_some()
    }
}

fn lock_slot(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

async fn run_session(
    api: Arc<dyn DashboardApi>,
    slot: Arc<Mutex<Slot>>,
    tag: PollTag,
    token: CancellationToken,
    interval: Duration,
    observer: Arc<dyn PollObserver>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tick: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(tag = %tag, "polling loop stopped");
                return;
            }
            _ = ticker.tick() => {}
        }
        tick += 1;

        // The fetch itself is never interrupted; a superseded result is
        // discarded at delivery.
        let snapshot = match api.fetch_metrics(&tag.job_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let e = e.into_transient(&tag.job_id);
                warn!(tag = %tag, tick, error = %e, "metrics fetch failed, retrying next tick");
                continue;
            }
        };

        match deliver(&slot, &token, &tag, &snapshot, observer.as_ref()) {
            Delivery::Continue => {
                debug!(tag = %tag, tick, status = %snapshot.status, metrics = snapshot.metrics.len(), "snapshot delivered");
            }
            Delivery::Terminal => {
                debug!(tag = %tag, tick, "polling reached done");
                return;
            }
            Delivery::Stale => {
                debug!(tag = %tag, tick, "discarding snapshot of superseded session");
                return;
            }
        }
    }
}

fn deliver(
    slot: &Mutex<Slot>,
    token: &CancellationToken,
    tag: &PollTag,
    snapshot: &MetricSnapshot,
    observer: &dyn PollObserver,
) -> Delivery {
    let mut slot = lock_slot(slot);
    if token.is_cancelled() || !slot.is_current(tag) {
        return Delivery::Stale;
    }

    observer.on_snapshot(tag, snapshot);
    if !snapshot.is_done() {
        return Delivery::Continue;
    }

    observer.on_terminal(tag, snapshot);
    slot.active = None;
    Delivery::Terminal
}
