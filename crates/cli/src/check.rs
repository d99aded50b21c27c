//! `mgrid check`: report which of a monthly run's inputs are present.

use std::path::PathBuf;

use metagrid_config::{Prerequisite, RunConfig};
use serde::Serialize;

use crate::exit_codes::EXIT_MISSING_INPUTS;
use crate::CliError;

#[derive(Serialize)]
struct CheckOutput<'a> {
    period: String,
    ready: bool,
    inputs: &'a [Prerequisite],
    outputs: Vec<(&'static str, PathBuf)>,
}

pub fn cmd_check(config: PathBuf, json: bool) -> Result<(), CliError> {
    let run = RunConfig::load(&config)?;
    let prereqs = run.prerequisites();
    let ready = run.ready();
    let outputs = vec![
        ("formation database", run.formation_db_path()),
        ("goals database", run.goals_db_path()),
        ("capacity report", run.capacity_report_path("xlsx")),
        ("apprentices report", run.apprentices_report_path()),
    ];

    if json {
        let out = CheckOutput {
            period: run.period().to_string(),
            ready,
            inputs: &prereqs,
            outputs,
        };
        let text = serde_json::to_string_pretty(&out).map_err(|e| CliError::other(e.to_string()))?;
        println!("{}", text);
    } else {
        println!("Run {} ({})", run.period(), config.display());
        for p in &prereqs {
            let status = match (p.exists, p.required) {
                (true, _) => "ok",
                (false, true) => "MISSING",
                (false, false) => "absent",
            };
            println!("  [{:<7}] {:<26} {}", status, p.label, p.path.display());
        }
        println!();
        for (label, path) in &outputs {
            println!("  {:<36} {}", label, path.display());
        }
    }

    if ready {
        return Ok(());
    }
    let missing = prereqs.iter().filter(|p| p.required && !p.exists).count();
    Err(CliError {
        code: EXIT_MISSING_INPUTS,
        message: format!("{} required input file(s) missing", missing),
        hint: Some("place the monthly exports under base_dir or set [inputs] paths in the run config".into()),
    })
}
