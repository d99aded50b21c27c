use std::fmt;

use metagrid_engine::EngineError;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Layout validation error (no sheets, key arity mismatch, etc.).
    ConfigValidation(String),
    /// A delta pair or join references a metric no source declares.
    UnknownColumn { table: String, column: String },
    /// Sheet, header or sink failure from the engine.
    Engine(EngineError),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "layout parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "layout validation error: {msg}"),
            Self::UnknownColumn { table, column } => {
                write!(f, "table '{table}': unknown column '{column}'")
            }
            Self::Engine(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ReconError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Engine(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EngineError> for ReconError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}
