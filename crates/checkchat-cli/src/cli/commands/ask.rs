use anyhow::Result;
use checkchat_core::Language;
use serde_json::json;

use super::session::Session;
use super::{print_json, Settings};
use crate::cli::args::{AskArgs, OutputFormat};
use crate::cli::render::render_projection;
use crate::exit_codes::EXIT_SUCCESS;

pub async fn run(args: AskArgs, settings: Settings) -> Result<i32> {
    let language = args
        .language
        .map(Language::from)
        .unwrap_or(settings.config.language);
    let demo = settings.config.demo || args.demo;
    let config = settings.config.with_demo(demo);

    let mut session = Session::open(&config, settings.registry, args.watch, args.format)?;
    let reply = session.controller.submit(&args.prompt, language).await?;

    if args.format == OutputFormat::Text {
        println!("job {}\n", reply.id);
        println!("{}\n", reply.response);
        if reply.warning {
            let score = reply
                .score
                .map(|s| format!(" (source consistency {:.2})", s))
                .unwrap_or_default();
            println!("warning: answer may not be supported by its source{}\n", score);
        }
    }

    let mut result = session.wait_done(&reply.id).await?;
    if let Some(reference) = &args.reference {
        session
            .controller
            .submit_reference(&reply.id, reference)
            .await?;
        result = session.wait_done(&reply.id).await?;
    }

    match args.format {
        OutputFormat::Text => print!("{}", render_projection(&result.projection)),
        OutputFormat::Json => print_json(&json!({ "reply": reply, "result": result }))?,
    }
    Ok(EXIT_SUCCESS)
}
