use std::sync::Arc;

use anyhow::Result;
use checkchat_core::{
    ClientError, DashboardApi, DashboardClient, JobId, JobStatus, MetricSnapshot, ResultProjector,
};
use serde_json::json;
use tracing::debug;

use super::session::Session;
use super::{print_json, Settings};
use crate::cli::args::{MetricsArgs, OutputFormat};
use crate::cli::render::render_projection;
use crate::exit_codes::EXIT_SUCCESS;

pub async fn run(args: MetricsArgs, settings: Settings) -> Result<i32> {
    let job_id = JobId::from(args.job_id);

    let projection = if args.watch {
        let mut session = Session::open(&settings.config, settings.registry, true, args.format)?;
        session.controller.attach(job_id.clone());
        session.wait_done(&job_id).await?.projection
    } else {
        let client = DashboardClient::new(&settings.config)?;
        let snapshot = match client.fetch_metrics(&job_id).await {
            Ok(snapshot) => snapshot,
            // 400 means nothing has been computed for the job yet
            Err(ClientError::Request {
                status: Some(400),
                message,
            }) => {
                debug!(job_id = %job_id, %message, "metrics not ready");
                MetricSnapshot::new(JobStatus::New)
            }
            Err(e) => return Err(e.into()),
        };
        ResultProjector::new(Arc::new(settings.registry)).project(&snapshot)
    };

    match args.format {
        OutputFormat::Text => print!("{}", render_projection(&projection)),
        OutputFormat::Json => print_json(&json!({ "job_id": job_id, "projection": projection }))?,
    }
    Ok(EXIT_SUCCESS)
}
