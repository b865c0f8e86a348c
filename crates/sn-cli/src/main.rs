//! # sn-sim
//!
//! Sequencing simulator. Loads a course structure, replays a script of
//! navigation requests and tracking updates against one session, and prints
//! one JSON line per step followed by the final sequencing state.

#![deny(unsafe_code)]

mod rte;
mod script;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Value, json};
use sn_core::logging::init_subscriber;
use sn_session::SequencingSession;
use sn_settings::{SnSettings, get_settings, init_settings, load_settings, load_settings_from_path};
use sn_tree::ActivityTreeSpec;
use tracing::{info, warn};

use crate::rte::ScriptedRte;
use crate::script::{Step, parse_script};

/// Replay navigation scripts against a course structure.
#[derive(Parser, Debug)]
#[command(name = "sn-sim", about = "Replay navigation scripts against a course structure")]
struct Cli {
    /// Course structure (JSON activity tree).
    course: PathBuf,

    /// Script file, one step per line.
    #[arg(long, short)]
    script: Option<PathBuf>,

    /// Extra step, run after the script. Repeatable.
    #[arg(long = "step", short = 'x')]
    steps: Vec<String>,

    /// Settings file (defaults to `~/.scorm-sn/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log filter, overriding settings.
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings: {}", path.display()))?,
        None => load_settings().context("Failed to load settings")?,
    };
    if let Some(level) = &cli.log_level {
        settings.logging.level.clone_from(level);
    }
    init_subscriber(&settings.logging.level, settings.logging.format);
    if init_settings(settings).is_err() {
        warn!("settings were already initialized");
    }
    let settings = get_settings();

    let course = load_course(&cli.course)?;
    let mut steps = match &cli.script {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read script: {}", path.display()))?;
            parse_script(&text).with_context(|| format!("Invalid script: {}", path.display()))?
        }
        None => Vec::new(),
    };
    for raw in &cli.steps {
        steps.push(Step::parse(raw).with_context(|| format!("Invalid --step {raw:?}"))?);
    }

    let mut out = std::io::stdout().lock();
    for record in replay(settings, &course, &steps)? {
        writeln!(out, "{record}")?;
    }
    Ok(())
}

fn load_course(path: &Path) -> Result<ActivityTreeSpec> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read course: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid course structure: {}", path.display()))
}

/// Run `steps` against a fresh session; one JSON record per step, then the
/// final state.
fn replay(settings: &SnSettings, course: &ActivityTreeSpec, steps: &[Step]) -> Result<Vec<Value>> {
    let rte = ScriptedRte::default();
    let session = SequencingSession::new(settings);
    session
        .initialize_with_tracking(course, Box::new(rte.clone()))
        .context("Failed to initialize sequencing session")?;
    info!(session_id = %session.id(), steps = steps.len(), "replaying script");

    let mut records = Vec::with_capacity(steps.len() + 1);
    for (n, step) in steps.iter().enumerate() {
        let result = run_step(&session, &rte, step)
            .with_context(|| format!("Step {} ({step}) failed", n + 1))?;
        records.push(json!({ "step": step.to_string(), "result": result }));
    }
    records.push(json!({ "state": session.get_sequencing_state() }));
    Ok(records)
}

fn run_step(session: &SequencingSession, rte: &ScriptedRte, step: &Step) -> Result<Value> {
    Ok(match step {
        Step::Navigate(request) => serde_json::to_value(session.process_navigation_request(request)?)?,
        Step::Track { activity_id, value } => {
            rte.record(activity_id, value.clone());
            match session.update_tracking(activity_id, value)? {
                Ok(changed) => json!({ "changed": changed }),
                Err(reason) => json!({ "rejected": reason }),
            }
        }
        Step::Rollup(activity_id) => match session.rollup(activity_id)? {
            Ok(report) => serde_json::to_value(report)?,
            Err(reason) => json!({ "rejected": reason }),
        },
        Step::State => serde_json::to_value(session.get_sequencing_state())?,
        Step::Terminate => serde_json::to_value(session.terminate()?)?,
    })
}
