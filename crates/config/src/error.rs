use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// TOML parse / deserialization error.
    Parse(String),
    /// Semantically invalid settings (zero commit window, etc.).
    Validation(String),
    /// Month or year could not be determined.
    Period(String),
    /// Config file could not be read.
    Io(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::Validation(msg) => write!(f, "config validation error: {msg}"),
            Self::Period(msg) => write!(f, "period error: {msg}"),
            Self::Io(msg) => write!(f, "config read error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
