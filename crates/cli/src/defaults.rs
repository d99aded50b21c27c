//! `--config`: a run file fills in whatever the flags leave out.

use std::path::Path;

use metagrid_config::RunConfig;

use crate::CliError;

/// Run configuration for one command, if `--config` was given.
pub struct RunDefaults(Option<RunConfig>);

impl RunDefaults {
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let Some(path) = path else {
            return Ok(Self(None));
        };
        let run = RunConfig::load(path)?;
        tracing::info!(config = %path.display(), period = %run.period(), "run config loaded");
        Ok(Self(Some(run)))
    }

    /// `flag` if given, else the run file's value. Without either the
    /// setting named `what` is a usage error.
    pub fn require<T>(
        &self,
        flag: Option<T>,
        what: &str,
        from_run: impl FnOnce(&RunConfig) -> T,
    ) -> Result<T, CliError> {
        match (flag, &self.0) {
            (Some(value), _) => Ok(value),
            (None, Some(run)) => Ok(from_run(run)),
            (None, None) => Err(CliError::args(format!("missing {what}"))
                .with_hint("pass it on the command line or use --config <RUN.toml>")),
        }
    }

    /// `flag` if given, else the run file's value, else `None`.
    pub fn or_run<T>(&self, flag: Option<T>, from_run: impl FnOnce(&RunConfig) -> Option<T>) -> Option<T> {
        flag.or_else(|| self.0.as_ref().and_then(from_run))
    }
}
