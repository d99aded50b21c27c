// Monthly run configuration loaded from TOML

use std::fs;
use std::path::{Path, PathBuf};

use metagrid_engine::normalize::DEFAULT_COMMIT_EVERY;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::period::{Month, Period};

/// Folder under `base_dir` holding per-month working files.
pub const PROCESS_DIR: &str = "PROCESO_REPORTE_ECONOMIA_NARANJA";

/// Explicit input paths; any left unset derive from the period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    pub formation: Option<PathBuf>,
    pub progress: Option<PathBuf>,
    pub apprentices: Option<PathBuf>,
    pub goals: Option<PathBuf>,
    /// Optional; the orange-economy program catalog.
    pub orange_catalog: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub month: Month,
    pub year: i32,
    pub base_dir: PathBuf,
    #[serde(default)]
    pub inputs: InputPaths,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub formation_db: Option<PathBuf>,
    #[serde(default)]
    pub goals_db: Option<PathBuf>,
    #[serde(default = "default_commit_every")]
    pub commit_every: usize,
    /// Year of the goals to reconcile against; defaults to `year`.
    #[serde(default)]
    pub goals_year: Option<i32>,
}

fn default_commit_every() -> usize {
    DEFAULT_COMMIT_EVERY
}

/// One input file the run depends on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prerequisite {
    pub label: &'static str,
    pub path: PathBuf,
    pub required: bool,
    pub exists: bool,
}

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.commit_every == 0 {
            return Err(ConfigError::Validation("commit_every must be at least 1".into()));
        }
        if !(2000..=2099).contains(&self.year) {
            return Err(ConfigError::Validation(format!("year out of range: {}", self.year)));
        }
        Ok(())
    }

    pub fn period(&self) -> Period {
        Period::new(self.month, self.year)
    }

    pub fn goals_year(&self) -> i32 {
        self.goals_year.unwrap_or(self.year)
    }

    /// `{base_dir}/{year}/{MM}-{Mes}`
    pub fn source_dir(&self) -> PathBuf {
        self.base_dir
            .join(self.year.to_string())
            .join(self.period().folder_name())
    }

    /// Intermediate databases and reports for the month.
    pub fn work_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => self
                .base_dir
                .join(PROCESS_DIR)
                .join(self.month.name())
                .join("datos_intermedios"),
        }
    }

    pub fn formation_workbook(&self) -> PathBuf {
        self.inputs.formation.clone().unwrap_or_else(|| {
            self.source_dir()
                .join(format!("PE-04_FORMACION NACIONAL {} {}.xlsb", self.month.name(), self.year))
        })
    }

    pub fn progress_workbook(&self) -> PathBuf {
        self.inputs.progress.clone().unwrap_or_else(|| {
            self.source_dir().join(format!(
                "PRIMER AVANCE CUPOS DE FORMACION {} {}.xlsb",
                self.month.name(),
                self.year
            ))
        })
    }

    pub fn apprentices_workbook(&self) -> PathBuf {
        self.inputs.apprentices.clone().unwrap_or_else(|| {
            self.source_dir().join(format!(
                "PRIMER AVANCE EN APRENDICES {} {}.xlsb",
                self.month.name(),
                self.year
            ))
        })
    }

    pub fn goals_workbook(&self) -> PathBuf {
        self.inputs.goals.clone().unwrap_or_else(|| {
            self.base_dir
                .join(self.goals_year().to_string())
                .join(format!("Metas SENA {}.xlsx", self.goals_year()))
        })
    }

    pub fn formation_db_path(&self) -> PathBuf {
        self.formation_db.clone().unwrap_or_else(|| {
            self.work_dir()
                .join(format!("sena_formacion_{}.db", self.month.name().to_lowercase()))
        })
    }

    pub fn goals_db_path(&self) -> PathBuf {
        self.goals_db
            .clone()
            .unwrap_or_else(|| self.work_dir().join(format!("metas_sena_{}.db", self.goals_year())))
    }

    pub fn capacity_report_path(&self, extension: &str) -> PathBuf {
        self.work_dir()
            .join(format!("cupos_disponibles_por_regional_{}.{extension}", self.goals_year()))
    }

    pub fn apprentices_report_path(&self) -> PathBuf {
        self.work_dir()
            .join(format!("{}.xlsx", self.period().apprentices_report_name()))
    }

    /// Input files in processing order, with whether each exists on disk.
    pub fn prerequisites(&self) -> Vec<Prerequisite> {
        let mut list = vec![
            ("PE-04 formation workbook", self.formation_workbook(), true),
            ("progress workbook", self.progress_workbook(), true),
            ("apprentices workbook", self.apprentices_workbook(), true),
            ("goals workbook", self.goals_workbook(), true),
        ];
        if let Some(catalog) = &self.inputs.orange_catalog {
            list.push(("orange-economy catalog", catalog.clone(), false));
        }
        list.into_iter()
            .map(|(label, path, required)| Prerequisite {
                exists: path.is_file(),
                label,
                path,
                required,
            })
            .collect()
    }

    /// True when every required input is present.
    pub fn ready(&self) -> bool {
        self.prerequisites().iter().all(|p| p.exists || !p.required)
    }
}
