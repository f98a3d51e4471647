use anyhow::Result;

use super::{print_json, Settings};
use crate::cli::args::{OutputFormat, RegistryArgs};
use crate::cli::render::{registry_json, render_registry};
use crate::exit_codes::EXIT_SUCCESS;

pub fn run(args: RegistryArgs, settings: Settings) -> Result<i32> {
    match args.format {
        OutputFormat::Text => print!("{}", render_registry(&settings.registry)),
        OutputFormat::Json => print_json(&registry_json(&settings.registry))?,
    }
    Ok(EXIT_SUCCESS)
}
