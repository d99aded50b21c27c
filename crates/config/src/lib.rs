// Reporting periods and run configuration

pub mod error;
pub mod period;
pub mod run;

pub use error::ConfigError;
pub use period::{year_from_file_name, Month, Period};
pub use run::{Prerequisite, RunConfig};
