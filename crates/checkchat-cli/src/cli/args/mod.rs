use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod common;
pub use common::*;

#[derive(Parser)]
#[command(
    name = "checkchat",
    version,
    about = "Submit prompts to an evaluation dashboard and follow their quality metrics"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct GlobalArgs {
    /// Dashboard file (YAML, `version: 1`) with client settings and threshold overrides
    #[arg(long, global = true, env = "CHECKCHAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// API base URL, `/api` prefix included (overrides the config file)
    #[arg(long, global = true, env = "CHECKCHAT_URL")]
    pub url: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Submit a prompt and wait for its metrics
    Ask(AskArgs),
    /// Show the metrics of an existing job
    Metrics(MetricsArgs),
    /// Attach a reference answer to a finished job and wait for reference-based metrics
    Reference(ReferenceArgs),
    /// Print the metric registry (after threshold overrides)
    Registry(RegistryArgs),
}

#[derive(Parser, Clone, Debug)]
pub struct AskArgs {
    /// Prompt text
    pub prompt: String,

    /// Answer language (default: config / CHECKCHAT_LANGUAGE)
    #[arg(long, value_enum)]
    pub language: Option<LanguageArg>,

    /// Use the canned-answer demo endpoint
    #[arg(long)]
    pub demo: bool,

    /// Reference answer to submit once the base metrics are done
    #[arg(long)]
    pub reference: Option<String>,

    /// Print intermediate snapshots while polling
    #[arg(long)]
    pub watch: bool,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Parser, Clone, Debug)]
pub struct MetricsArgs {
    /// Job id returned by `ask`
    pub job_id: String,

    /// Poll until the metrics are done instead of fetching once
    #[arg(long)]
    pub watch: bool,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Parser, Clone, Debug)]
pub struct ReferenceArgs {
    /// Job id returned by `ask`
    pub job_id: String,

    /// Reference (expected) answer
    pub reference: String,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Parser, Clone, Debug)]
pub struct RegistryArgs {
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}
