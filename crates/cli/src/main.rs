// Headless CLI for the monthly formation reports

mod check;
mod defaults;
mod exit_codes;
mod import;
mod labels;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use metagrid_config::ConfigError;
use metagrid_engine::EngineError;
use metagrid_recon::ReconError;
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_CONFIG, EXIT_ERROR, EXIT_SINK, EXIT_STRUCTURAL, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "mgrid")]
#[command(about = "Normalize monthly formation workbooks and build the capacity and apprentices reports")]
#[command(version)]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a PE-04 formation workbook into a SQLite database
    #[command(after_help = "\
Examples:
  mgrid import-formation \"PE-04_FORMACION NACIONAL SEPTIEMBRE 2025.xlsb\" --db sena_formacion_septiembre.db
  mgrid import-formation pe04.xlsb --db formacion.db --catalog programas_naranja.xlsx
  mgrid import-formation pe04.xlsb --db formacion.db --sheet \"Hoja1\" --commit-every 1000 --json
  mgrid import-formation --config run.toml")]
    ImportFormation {
        /// PE-04 workbook (.xlsb, .xlsx, .xls, .ods); default from --config
        workbook: Option<PathBuf>,

        /// SQLite database to create or update; default from --config
        #[arg(long)]
        db: Option<PathBuf>,

        /// Sheet to read (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,

        /// Orange-economy program catalog; skipped with a warning if absent
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Rows per transaction
        #[arg(long)]
        commit_every: Option<usize>,

        /// Run configuration filling in settings not given as flags
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the import summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load the yearly goals workbook into a SQLite database
    #[command(after_help = "\
Examples:
  mgrid import-goals \"Metas SENA 2025.xlsx\" --db metas_sena_2025.db
  mgrid import-goals metas.xlsx --db metas.db --year 2025
  mgrid import-goals --config run.toml")]
    ImportGoals {
        /// Goals workbook with the METAS FORMACION X REGIONAL sheet; default from --config
        workbook: Option<PathBuf>,

        /// SQLite database to create or update; default from --config
        #[arg(long)]
        db: Option<PathBuf>,

        /// Goal year (default: --config, then the file name)
        #[arg(long)]
        year: Option<i32>,

        /// Run configuration filling in settings not given as flags
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the import summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remaining formation capacity per regional: goals minus progress
    #[command(after_help = "\
Examples:
  mgrid capacity \"PRIMER AVANCE CUPOS DE FORMACION SEPTIEMBRE 2025.xlsb\" --goals-db metas_sena_2025.db -o cupos.xlsx
  mgrid capacity avance.xlsb --goals-db metas.db --year 2025 -o cupos.csv
  mgrid capacity avance.xlsb --goals-db metas.db --layout capacity.toml -o cupos.csv
  mgrid capacity --config run.toml")]
    Capacity {
        /// Progress workbook with the regional sheets; default from --config
        workbook: Option<PathBuf>,

        /// Database written by `mgrid import-goals`; default from --config
        #[arg(long)]
        goals_db: Option<PathBuf>,

        /// Goal year (default: --config, then the file name)
        #[arg(long)]
        year: Option<i32>,

        /// Sheet layout TOML replacing the built-in one
        #[arg(long)]
        layout: Option<PathBuf>,

        /// Output file (.csv or .xlsx); default from --config
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Run configuration filling in settings not given as flags
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Monthly apprentices per municipality with department subtotals
    #[command(after_help = "\
Examples:
  mgrid apprentices \"PRIMER AVANCE EN APRENDICES SEPTIEMBRE 2025.xlsb\" -o \"SENA Mensual Nacional Sep 2025.xlsx\"
  mgrid apprentices aprendices.xlsb --month 9 --year 2025 -o aprendices.csv
  mgrid apprentices --config run.toml")]
    Apprentices {
        /// Apprentices workbook with the five municipal sheets; default from --config
        workbook: Option<PathBuf>,

        /// Report month: name, abbreviation or number (default: --config, then the file name)
        #[arg(long)]
        month: Option<String>,

        /// Report year (default: --config, then the file name)
        #[arg(long)]
        year: Option<i32>,

        /// Sheet layout TOML replacing the built-in one
        #[arg(long)]
        layout: Option<PathBuf>,

        /// Output file (.csv or .xlsx); default from --config
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Run configuration filling in settings not given as flags
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Verify that a monthly run's input files are in place
    #[command(after_help = "\
Examples:
  mgrid check run.toml
  mgrid check run.toml --json")]
    Check {
        /// Run configuration (month, year, base_dir, optional explicit paths)
        config: PathBuf,

        /// Print the prerequisite list as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::ImportFormation { workbook, db, sheet, catalog, commit_every, config, json } => {
            import::cmd_import_formation(workbook, db, sheet, catalog, commit_every, config, json)
        }
        Commands::ImportGoals { workbook, db, year, config, json } => {
            import::cmd_import_goals(workbook, db, year, config, json)
        }
        Commands::Capacity { workbook, goals_db, year, layout, output, config } => {
            report::cmd_capacity(workbook, goals_db, year, layout, output, config)
        }
        Commands::Apprentices { workbook, month, year, layout, output, config } => {
            report::cmd_apprentices(workbook, month, year, layout, output, config)
        }
        Commands::Check { config, json } => check::cmd_check(config, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        let (code, hint) = match &err {
            EngineError::SheetMissing { .. } => (
                EXIT_STRUCTURAL,
                Some("check that the workbook is this month's export".to_string()),
            ),
            EngineError::HeaderNotFound { .. } => (
                EXIT_STRUCTURAL,
                Some("the sheet layout may have changed; try --layout with adjusted header rules".to_string()),
            ),
            EngineError::EmptyGrid { .. } => (EXIT_STRUCTURAL, None),
            EngineError::UnknownTable(_) => (
                EXIT_SINK,
                Some("the database may not have been initialized by the matching import".to_string()),
            ),
            EngineError::Schema(_) | EngineError::Sink(_) => (EXIT_SINK, None),
            EngineError::Source(_) => (EXIT_USAGE, None),
        };
        Self { code, message: err.to_string(), hint }
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        match err {
            ReconError::Engine(e) => e.into(),
            other => Self { code: EXIT_CONFIG, message: other.to_string(), hint: None },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::Period(_) => Some("pass --month and --year explicitly".to_string()),
            _ => None,
        };
        Self { code: EXIT_CONFIG, message: err.to_string(), hint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn structural_errors_map_to_structural_exit() {
        let err: CliError = EngineError::SheetMissing {
            sheet: "NIVEL REGIONAL".into(),
            available: vec!["Hoja1".into()],
        }
        .into();
        assert_eq!(err.code, EXIT_STRUCTURAL);
        assert!(err.hint.is_some());

        let err: CliError = ReconError::Engine(EngineError::Sink("disk full".into())).into();
        assert_eq!(err.code, EXIT_SINK);
    }

    #[test]
    fn layout_and_period_errors_map_to_config_exit() {
        let err: CliError = ReconError::ConfigValidation("no sheets".into()).into();
        assert_eq!(err.code, EXIT_CONFIG);
        let err: CliError = ConfigError::Period("no month".into()).into();
        assert_eq!(err.code, EXIT_CONFIG);
        assert!(err.hint.is_some());
    }

    #[test]
    fn global_verbose_after_subcommand() {
        let cli = Cli::try_parse_from(["mgrid", "check", "run.toml", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Check { json: false, .. }));
    }

    #[test]
    fn run_file_replaces_positional_workbook() {
        let cli = Cli::try_parse_from(["mgrid", "capacity", "--config", "run.toml"]).unwrap();
        match cli.command {
            Commands::Capacity { workbook, output, config, .. } => {
                assert!(workbook.is_none());
                assert!(output.is_none());
                assert_eq!(config, Some(PathBuf::from("run.toml")));
            }
            _ => panic!("expected capacity"),
        }
    }
}
