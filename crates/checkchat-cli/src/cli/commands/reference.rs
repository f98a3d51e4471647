use anyhow::Result;
use checkchat_core::JobId;

use super::session::Session;
use super::{print_json, Settings};
use crate::cli::args::{OutputFormat, ReferenceArgs};
use crate::cli::render::render_projection;
use crate::exit_codes::EXIT_SUCCESS;

/// The job is re-attached and polled to `done` first, so a reference is
/// only ever sent for a job whose base metrics are complete.
pub async fn run(args: ReferenceArgs, settings: Settings) -> Result<i32> {
    let job_id = JobId::from(args.job_id);
    let mut session = Session::open(&settings.config, settings.registry, false, args.format)?;

    session.controller.attach(job_id.clone());
    session.wait_done(&job_id).await?;

    session
        .controller
        .submit_reference(&job_id, &args.reference)
        .await?;
    let result = session.wait_done(&job_id).await?;

    match args.format {
        OutputFormat::Text => print!("{}", render_projection(&result.projection)),
        OutputFormat::Json => print_json(&result)?,
    }
    Ok(EXIT_SUCCESS)
}
