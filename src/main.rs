use std::io;

use anyhow::Context;
use clap::Parser;
use command_parser::*;
use env_logger::Env;
use lfpipe::{
    run_path,
    sink::{JsonSink, TextSink},
};
use log::warn;

mod command_parser;

fn main() -> anyhow::Result<()> {
    let app = App::parse();

    let default_filter = if app.global_opts.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let config = app.global_opts.to_config();
    let out = io::stdout().lock();

    let report = match app.global_opts.format {
        OutputFormat::Text => run_path(&config, &app.input, TextSink::new(out)),
        OutputFormat::Json => run_path(&config, &app.input, JsonSink::new(out)),
    }
    .with_context(|| format!("pipeline over {} failed", app.input.display()))?;

    if report.skipped > 0 || report.dropped > 0 {
        warn!(
            "lost work under allocation pressure: {} items skipped, {} results dropped",
            report.skipped, report.dropped
        );
    }

    Ok(())
}
