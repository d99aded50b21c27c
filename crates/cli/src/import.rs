//! `mgrid import-formation` and `mgrid import-goals`.

use std::fs;
use std::path::{Path, PathBuf};

use metagrid_config::{year_from_file_name, RunConfig};
use metagrid_engine::formation::{
    formation_tables, orange_catalog_plan, pe04_plan, ORANGE_CATALOG_TABLE,
};
use metagrid_engine::goals::{extract_goals, persist_goals, GoalsSummary, GOALS_SHEET};
use metagrid_engine::normalize::table_counts;
use metagrid_engine::{load_grid, GridSource, ImportSummary, LoadOptions};
use metagrid_io::{SqliteSink, Workbook};
use serde::Serialize;

use crate::defaults::RunDefaults;
use crate::CliError;

#[derive(Serialize)]
struct FormationOutput {
    formation: ImportSummary,
    catalog: Option<ImportSummary>,
    tables: Vec<TableCount>,
}

#[derive(Serialize)]
struct TableCount {
    table: String,
    rows: usize,
}

/// Open the database, creating its parent directory if needed.
pub(crate) fn open_sink(db: &Path) -> Result<SqliteSink, CliError> {
    if let Some(parent) = db.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| CliError::io(format!("{}: {}", parent.display(), e)))?;
    }
    Ok(SqliteSink::open(db)?)
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn to_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::other(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// ============================================================================
// import-formation
// ============================================================================

pub fn cmd_import_formation(
    workbook: Option<PathBuf>,
    db: Option<PathBuf>,
    sheet: Option<String>,
    catalog: Option<PathBuf>,
    commit_every: Option<usize>,
    config: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let defaults = RunDefaults::load(config.as_deref())?;
    let workbook = defaults.require(workbook, "<WORKBOOK>", RunConfig::formation_workbook)?;
    let db = defaults.require(db, "--db", RunConfig::formation_db_path)?;
    let catalog = defaults.or_run(catalog, |r| r.inputs.orange_catalog.clone());
    let commit_every = defaults.or_run(commit_every, |r| Some(r.commit_every));

    let mut opts = LoadOptions::default();
    if let Some(n) = commit_every {
        if n == 0 {
            return Err(CliError::args("--commit-every must be at least 1"));
        }
        opts.commit_every = n;
    }

    let mut source = Workbook::open(&workbook)?;
    let grid = match &sheet {
        Some(name) => source.read_grid(name)?,
        None => source.first_grid()?,
    };
    tracing::info!(file = %workbook.display(), sheet = %grid.name, rows = grid.height(), "workbook read");

    let mut sink = open_sink(&db)?;
    let formation = load_grid(&grid, &pe04_plan(), &mut sink, opts)?;

    let catalog = match catalog {
        Some(path) if path.is_file() => {
            let mut source = Workbook::open(&path)?;
            let grid = source.first_grid()?;
            Some(load_grid(&grid, &orange_catalog_plan(), &mut sink, opts)?)
        }
        Some(path) => {
            tracing::warn!(file = %path.display(), "orange-economy catalog not found, skipping");
            None
        }
        None => None,
    };

    let names: Vec<String> = formation_tables()
        .into_iter()
        .filter(|t| catalog.is_some() || t != ORANGE_CATALOG_TABLE)
        .collect();
    let tables: Vec<TableCount> = table_counts(&sink, &names)?
        .into_iter()
        .map(|(table, rows)| TableCount { table, rows })
        .collect();

    if json {
        return to_json(&FormationOutput { formation, catalog, tables });
    }

    println!("{} -> {}", file_name(&workbook), db.display());
    println!(
        "  sheet '{}', header at row {}, {} data rows",
        formation.sheet,
        formation.header_row + 1,
        formation.data_rows
    );
    println!(
        "  {} fichas written, {} rows skipped, {} row errors, {} coercion defaults, {} commits",
        formation.facts_written,
        formation.rows_skipped,
        formation.row_errors,
        formation.coercion_defaults,
        formation.commits
    );
    if let Some(c) = &catalog {
        println!("  orange-economy catalog: {} programs read", c.data_rows);
    }
    println!();
    for t in &tables {
        println!("  {:<32} {:>10}", t.table, t.rows);
    }
    Ok(())
}

// ============================================================================
// import-goals
// ============================================================================

pub fn cmd_import_goals(
    workbook: Option<PathBuf>,
    db: Option<PathBuf>,
    year: Option<i32>,
    config: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let defaults = RunDefaults::load(config.as_deref())?;
    let workbook = defaults.require(workbook, "<WORKBOOK>", RunConfig::goals_workbook)?;
    let db = defaults.require(db, "--db", RunConfig::goals_db_path)?;
    let year = match defaults.or_run(year, |r| Some(r.goals_year())) {
        Some(y) => y,
        None => year_from_file_name(&file_name(&workbook))
            .map_err(|e| CliError::from(e).with_hint("pass --year explicitly"))?,
    };

    let mut source = Workbook::open(&workbook)?;
    let grid = source.read_grid(GOALS_SHEET)?;
    let goals = extract_goals(&grid)?;

    let mut sink = open_sink(&db)?;
    let summary = persist_goals(&goals, &mut sink, year)?;

    if json {
        return to_json(&summary);
    }
    print_goals(&workbook, &db, &summary);
    Ok(())
}

fn print_goals(workbook: &Path, db: &Path, s: &GoalsSummary) {
    println!("{} -> {} (year {})", file_name(workbook), db.display(), s.year);
    println!("  {:<24} {:>8}", "regionales", s.regions);
    println!("  {:<24} {:>8}", "categorias", s.categories);
    println!("  {:<24} {:>8}", "metas de cupos", s.quotas);
    println!("  {:<24} {:>8}", "metas de retencion", s.retention);
    println!("  {:<24} {:>8}", "metas de certificacion", s.certification);
    if s.skipped_rows > 0 || s.skipped_values > 0 {
        println!(
            "  skipped: {} rows without a regional code, {} non-numeric values",
            s.skipped_rows, s.skipped_values
        );
    }
}
