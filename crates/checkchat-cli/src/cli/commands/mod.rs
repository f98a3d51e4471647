use anyhow::Context;
use checkchat_core::{load_dashboard_file, ClientConfig, MetricRegistry};
use serde::Serialize;
use tracing::debug;

use super::args::*;

pub mod ask;
pub mod metrics;
pub mod reference;
pub mod registry;
mod session;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let settings = Settings::load(&cli.global)?;
    match cli.cmd {
        Command::Ask(args) => ask::run(args, settings).await,
        Command::Metrics(args) => metrics::run(args, settings).await,
        Command::Reference(args) => reference::run(args, settings).await,
        Command::Registry(args) => registry::run(args, settings),
    }
}

/// Client settings and registry after applying the config file and flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: ClientConfig,
    pub registry: MetricRegistry,
}

impl Settings {
    /// Precedence: `--url` / `CHECKCHAT_URL`, then the file's `client:`
    /// section, then the other `CHECKCHAT_*` variables.
    pub fn load(global: &GlobalArgs) -> anyhow::Result<Self> {
        let (mut config, registry) = match &global.config {
            Some(path) => {
                let file = load_dashboard_file(path)
                    .with_context(|| format!("loading {}", path.display()))?;
                let registry = file.registry()?;
                let config = file.client.unwrap_or_else(ClientConfig::from_env);
                (config, registry)
            }
            None => (ClientConfig::from_env(), MetricRegistry::default()),
        };
        if let Some(url) = &global.url {
            config = config.with_url(url.clone());
        }
        debug!(url = %config.url, poll_interval_ms = config.poll_interval_ms, metrics = registry.len(), "settings loaded");
        Ok(Self { config, registry })
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
