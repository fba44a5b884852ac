use crate::actions::ActionMap;
use crate::config::AppConfig;
use crate::orchestrator::Session;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "splitkeeper",
    version,
    about = "Terminal speedrun split timer"
)]
pub struct Cli {
    /// Run file to time against
    #[arg(value_name = "RUN_FILE", required_unless_present = "new")]
    pub run_file: Option<PathBuf>,

    /// Create a new single-segment run file and open the split editor
    #[arg(long, value_name = "PATH", conflicts_with = "run_file")]
    pub new: Option<PathBuf>,

    /// Configuration file (key bindings, tick rate, layout)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Timer refresh interval, overrides the config file
    #[arg(long)]
    pub tick_rate: Option<humantime::Duration>,

    /// Print a summary of the run file and exit (no TUI)
    #[arg(long)]
    pub summary: bool,
}

/// How the UI should open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartView {
    Timer,
    Editor,
}

pub fn run(args: Cli) -> Result<()> {
    let (path, definition, start_view) = match (&args.new, &args.run_file) {
        (Some(path), _) => {
            let def = crate::storage::create_run(path)?;
            eprintln!("Created: {}", path.display());
            (path.clone(), def, StartView::Editor)
        }
        (None, Some(path)) => (path.clone(), crate::storage::load_run(path)?, StartView::Timer),
        (None, None) => anyhow::bail!("a run file is required"),
    };

    if args.summary {
        return print_summary(&definition);
    }

    let config = AppConfig::discover(args.config.as_deref())?;
    let tick_rate = args
        .tick_rate
        .map(Duration::from)
        .unwrap_or(config.tick_interval);
    let session = Session::new(path, definition, ActionMap::new(config.hotkeys.clone()));

    #[cfg(feature = "tui")]
    let result = crate::tui::run(session, &config.layout, tick_rate, start_view);
    #[cfg(not(feature = "tui"))]
    let result = {
        // Fallback when built without TUI support.
        let _ = (tick_rate, start_view);
        print_summary(session.definition())
    };
    result
}

fn print_summary(definition: &crate::model::RunDefinition) -> Result<()> {
    let summary = crate::text_summary::build_text_summary(definition);
    for line in summary.lines {
        println!("{}", line);
    }
    Ok(())
}
