//! `mgrid capacity` and `mgrid apprentices`.

use std::fs;
use std::path::{Path, PathBuf};

use metagrid_config::{year_from_file_name, Month, Period, RunConfig};
use metagrid_engine::goals::declare_goal_tables;
use metagrid_engine::Table;
use metagrid_io::csv::write_csv;
use metagrid_io::xlsx::write_xlsx;
use metagrid_io::{SqliteSink, Workbook};
use metagrid_recon::{build_apprentices, build_capacity, capacity_targets, ReconError, ReportLayout};

use crate::defaults::RunDefaults;
use crate::import::file_name;
use crate::labels::{capacity_display, relabel_apprentices, relabel_capacity};
use crate::CliError;

/// Sheet name of the capacity workbook.
pub const CAPACITY_SHEET: &str = "Cupos Disponibles";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Csv,
    Xlsx,
}

impl OutputFormat {
    fn from_path(path: &Path) -> Result<Self, CliError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("xlsx") => Ok(Self::Xlsx),
            _ => Err(CliError::args(format!("unsupported output: {}", path.display()))
                .with_hint("use a .csv or .xlsx file name")),
        }
    }
}

fn write_table(table: &Table, path: &Path, sheet: &str) -> Result<(), CliError> {
    let format = OutputFormat::from_path(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| CliError::io(format!("{}: {}", parent.display(), e)))?;
    }
    let written = match format {
        OutputFormat::Csv => write_csv(table, path),
        OutputFormat::Xlsx => write_xlsx(table, path, sheet),
    };
    written.map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?;
    tracing::info!(file = %path.display(), rows = table.len(), "report written");
    Ok(())
}

fn load_layout(
    path: Option<PathBuf>,
    builtin: fn() -> Result<ReportLayout, ReconError>,
) -> Result<ReportLayout, CliError> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?;
            Ok(ReportLayout::from_toml(&text)?)
        }
        None => Ok(builtin()?),
    }
}

// ============================================================================
// capacity
// ============================================================================

pub fn cmd_capacity(
    workbook: Option<PathBuf>,
    goals_db: Option<PathBuf>,
    year: Option<i32>,
    layout: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<(), CliError> {
    let defaults = RunDefaults::load(config.as_deref())?;
    let workbook = defaults.require(workbook, "<WORKBOOK>", RunConfig::progress_workbook)?;
    let goals_db = defaults.require(goals_db, "--goals-db", RunConfig::goals_db_path)?;
    let output = defaults.require(output, "--output", |r| r.capacity_report_path("xlsx"))?;

    OutputFormat::from_path(&output)?;
    let layout = load_layout(layout, ReportLayout::capacity)?;
    let year = match defaults.or_run(year, |r| Some(r.goals_year())) {
        Some(y) => y,
        None => year_from_file_name(&file_name(&workbook))
            .map_err(|e| CliError::from(e).with_hint("pass --year explicitly"))?,
    };

    if !goals_db.is_file() {
        return Err(CliError::io(format!("goals database not found: {}", goals_db.display()))
            .with_hint("run `mgrid import-goals` first"));
    }
    let mut sink = SqliteSink::open(&goals_db)?;
    declare_goal_tables(&mut sink)?;
    let targets = capacity_targets(&sink, year)?;
    if targets.table.is_empty() {
        tracing::warn!(year, "no capacity goals stored for this year");
    }

    let mut source = Workbook::open(&workbook)?;
    let report = build_capacity(&targets, &mut source, &layout)?;

    let mut table = report.to_table();
    relabel_capacity(&mut table);
    write_table(&table, &output, CAPACITY_SHEET)?;

    println!("Cupos disponibles por regional {} -> {}", report.year, output.display());
    println!(
        "  {} regionales, {} without goals excluded, {} invalid codes",
        report.rows.len(),
        report.excluded_keys,
        report.invalid_keys
    );
    println!();
    println!("  Totales nacionales");
    for (name, total) in report.outputs.iter().zip(&report.totals) {
        println!("  {:<48} {:>12}", capacity_display(name), total);
    }
    Ok(())
}

// ============================================================================
// apprentices
// ============================================================================

/// Known month/year win; whatever is missing comes from the file name.
fn resolve_period(workbook: &Path, month: Option<Month>, year: Option<i32>) -> Result<Period, CliError> {
    let name = file_name(workbook);
    match (month, year) {
        (Some(month), Some(year)) => Ok(Period::new(month, year)),
        (Some(month), None) => Ok(Period::new(month, year_from_file_name(&name)?)),
        (None, year) => {
            let detected = Period::from_file_name(&name)?;
            Ok(Period::new(detected.month, year.unwrap_or(detected.year)))
        }
    }
}

pub fn cmd_apprentices(
    workbook: Option<PathBuf>,
    month: Option<String>,
    year: Option<i32>,
    layout: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<(), CliError> {
    let defaults = RunDefaults::load(config.as_deref())?;
    let workbook = defaults.require(workbook, "<WORKBOOK>", RunConfig::apprentices_workbook)?;
    let output = defaults.require(output, "--output", RunConfig::apprentices_report_path)?;
    let month = month.map(|m| m.parse::<Month>()).transpose()?;
    let month = defaults.or_run(month, |r| Some(r.month));
    let year = defaults.or_run(year, |r| Some(r.year));

    OutputFormat::from_path(&output)?;
    let period = resolve_period(&workbook, month, year)?;
    let layout = load_layout(layout, ReportLayout::apprentices)?;
    tracing::info!(period = %period, "building apprentices report");

    let mut source = Workbook::open(&workbook)?;
    let report = build_apprentices(&mut source, &layout)?;

    let cutoff = period.cutoff_label();
    let mut table = report.to_table();
    relabel_apprentices(&mut table, &cutoff);
    write_table(&table, &output, &period.apprentices_report_name())?;

    println!("{} (corte: {}) -> {}", period.apprentices_report_name(), cutoff, output.display());
    println!(
        "  {} departamentos, {} municipios, {} invalid codes, {} column fallbacks",
        report.departments,
        report.municipalities,
        report.invalid_keys,
        report.warnings.len()
    );
    println!();
    println!("  Totales nacionales");
    for (name, total) in report.metrics.iter().zip(&report.totals) {
        println!("  {:<32} {:>12}", name, total);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a/cupos.CSV")).unwrap(), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_path(Path::new("r.xlsx")).unwrap(), OutputFormat::Xlsx);
        assert!(OutputFormat::from_path(Path::new("r.xlsb")).is_err());
        assert!(OutputFormat::from_path(Path::new("r")).is_err());
    }

    #[test]
    fn period_from_name_or_flags() {
        let wb = Path::new("/in/PRIMER AVANCE EN APRENDICES SEPTIEMBRE 2025.xlsb");
        assert_eq!(resolve_period(wb, None, None).unwrap(), Period::new(Month::Septiembre, 2025));
        assert_eq!(
            resolve_period(wb, Some(Month::Octubre), None).unwrap(),
            Period::new(Month::Octubre, 2025)
        );
        assert_eq!(
            resolve_period(Path::new("aprendices.xlsb"), Some(Month::Marzo), Some(2024)).unwrap(),
            Period::new(Month::Marzo, 2024)
        );
        let err = resolve_period(Path::new("aprendices.xlsb"), None, Some(2024)).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_CONFIG);
    }

    #[test]
    fn custom_layout_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.toml");
        fs::write(&path, "name = \"vacio\"\nsheets = []\n").unwrap();
        let err = load_layout(Some(path), ReportLayout::capacity).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_CONFIG);
    }
}
