//! Client for an LLM-evaluation dashboard backend.
//!
//! A prompt is submitted as a *job*; the backend computes quality metrics for
//! the model's answer asynchronously. This crate provides:
//!
//! - HTTP client for the dashboard API (`/chat`, `/metrics/{id}`, `/ref_metric`)
//! - A cancellable poller that follows one job until its metrics are done
//! - A registry classifying metrics into families with pass/fail thresholds
//! - A projector turning raw snapshots into display rows
//! - An [`EvalController`] tying the above into a per-job state machine
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use checkchat_core::{
//!     ClientConfig, DashboardClient, EvalController, EvalObserver, JobUpdate, Language,
//!     MetricRegistry,
//! };
//!
//! struct Print;
//!
//! impl EvalObserver for Print {
//!     fn on_update(&self, update: &JobUpdate) {
//!         println!("{} {} rows", update.phase, update.projection.rows().count());
//!     }
//! }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::from_env();
//! let client = Arc::new(DashboardClient::new(&config)?);
//! let controller = EvalController::new(client, &config, MetricRegistry::default(), Arc::new(Print));
//!
//! let reply = controller
//!     .submit("What is the capital of France?", Language::En)
//!     .await?;
//! println!("job {}: {}", reply.id, reply.response);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `CHECKCHAT_URL` | API base URL (default: `http://127.0.0.1:5000/api`) |
//! | `CHECKCHAT_TIMEOUT` | Request timeout in seconds (default: 60) |
//! | `CHECKCHAT_POLL_INTERVAL_MS` | Metrics polling interval (default: 1000) |
//! | `CHECKCHAT_LANGUAGE` | Default evaluation language, `en` or `ja` |
//! | `CHECKCHAT_DEMO` | Use the demo chat endpoint |
//!
//! Thresholds can be overridden through a versioned YAML file, see
//! [`config::DashboardFile`].

pub mod api;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod fake;
pub mod model;
pub mod poller;
pub mod projector;
pub mod registry;
pub mod submit;

// Re-export main types
pub use api::DashboardApi;
pub use client::DashboardClient;
pub use config::{load_dashboard_file, ClientConfig, DashboardFile, SUPPORTED_CONFIG_VERSION};
pub use controller::{EvalController, EvalObserver, JobPhase, JobUpdate};
pub use error::{ClientError, ClientResult};
pub use model::{
    ChatReply, ChatRequest, Job, JobId, JobStatus, Language, MetricResult, MetricSnapshot,
    ReferenceRequest,
};
pub use poller::{MetricPoller, PollObserver, PollTag};
pub use projector::{
    escape_html, round_half_even, DisplayRow, DisplayValue, Projection, ResultProjector,
    DISPLAY_PLACES,
};
pub use registry::{
    Direction, Evaluation, MetricDefinition, MetricFamily, MetricRegistry, Threshold,
    ThresholdOverrides,
};
pub use submit::{JobSubmitter, ReferenceSubmitter};
