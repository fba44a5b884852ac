mod actions;
mod cli;
mod config;
mod engine;
mod logging;
mod lss;
mod model;
mod orchestrator;
mod storage;
mod text_summary;
mod timecode;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    logging::init();
    let args = cli::Cli::parse();

    cli::run(args).inspect_err(|e| tracing::error!(error = %format!("{e:#}"), "fatal"))
}
