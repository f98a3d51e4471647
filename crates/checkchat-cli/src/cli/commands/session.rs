//! Controller wiring shared by the polling commands.

use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use checkchat_core::{
    ClientConfig, ClientError, DashboardClient, EvalController, EvalObserver, JobId, JobUpdate,
    MetricRegistry,
};
use tokio::sync::mpsc;

use crate::cli::args::OutputFormat;

/// Forwards controller updates to the command's task.
struct ChannelObserver {
    tx: mpsc::UnboundedSender<JobUpdate>,
}

impl EvalObserver for ChannelObserver {
    fn on_update(&self, update: &JobUpdate) {
        // receiver gone means the command already returned
        let _ = self.tx.send(update.clone());
    }
}

pub(crate) struct Session {
    pub controller: EvalController,
    updates: mpsc::UnboundedReceiver<JobUpdate>,
    watch: bool,
    format: OutputFormat,
}

impl Session {
    pub fn open(
        config: &ClientConfig,
        registry: MetricRegistry,
        watch: bool,
        format: OutputFormat,
    ) -> anyhow::Result<Self> {
        let client = DashboardClient::new(config)?;
        let (tx, updates) = mpsc::unbounded_channel();
        let controller = EvalController::new(
            Arc::new(client),
            config,
            registry,
            Arc::new(ChannelObserver { tx }),
        );
        Ok(Self {
            controller,
            updates,
            watch,
            format,
        })
    }

    /// Wait for the last update of the current polling cycle of `job_id`.
    /// Ctrl+C cancels polling and fails the command.
    pub async fn wait_done(&mut self, job_id: &JobId) -> anyhow::Result<JobUpdate> {
        loop {
            let update = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    self.controller.cancel();
                    return Err(ClientError::request(format!(
                        "interrupted before metrics of job {} were done",
                        job_id
                    ))
                    .into());
                }
                update = self.updates.recv() => update.context("polling stopped unexpectedly")?,
            };

            if &update.job_id != job_id {
                continue;
            }
            if update.terminal {
                return Ok(update);
            }
            if self.watch {
                self.progress(&update)?;
            }
        }
    }

    fn progress(&self, update: &JobUpdate) -> anyhow::Result<()> {
        // stdout carries only the final result
        eprintln!("{}", progress_line(update, self.format)?);
        Ok(())
    }
}

/// One line of watch progress: compact JSON, or a timestamped summary.
fn progress_line(update: &JobUpdate, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(update)?,
        OutputFormat::Text => {
            let computed = update
                .projection
                .rows()
                .filter(|r| r.value.as_number().is_some())
                .count();
            format!(
                "[{}] job {} {}: {} metric(s) computed",
                Local::now().format("%H:%M:%S"),
                update.job_id,
                update.projection.status,
                computed
            )
        }
    })
}
