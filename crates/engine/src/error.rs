use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A required sheet is not present in the workbook.
    SheetMissing { sheet: String, available: Vec<String> },
    /// No row within the scan window contains a header keyword.
    HeaderNotFound { sheet: String, keywords: Vec<String> },
    /// The grid has no rows at all.
    EmptyGrid { sheet: String },
    /// Upsert/query against a table that was never created.
    UnknownTable(String),
    /// Row shape or key does not match the declared table schema.
    Schema(String),
    /// Relational sink failure (SQLite error, etc.).
    Sink(String),
    /// Grid source failure (workbook cannot be opened or decoded).
    Source(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SheetMissing { sheet, available } => {
                write!(f, "sheet '{sheet}' not found (available: {})", available.join(", "))
            }
            Self::HeaderNotFound { sheet, keywords } => write!(
                f,
                "sheet '{sheet}': header not found in first {} rows (keywords: {})",
                crate::header::HEADER_SCAN_ROWS,
                keywords.join(", ")
            ),
            Self::EmptyGrid { sheet } => write!(f, "sheet '{sheet}' contains no rows"),
            Self::UnknownTable(table) => write!(f, "unknown table: {table}"),
            Self::Schema(msg) => write!(f, "schema error: {msg}"),
            Self::Sink(msg) => write!(f, "sink error: {msg}"),
            Self::Source(msg) => write!(f, "source error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl EngineError {
    /// Structural errors abort the current file's import.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::SheetMissing { .. } | Self::HeaderNotFound { .. } | Self::EmptyGrid { .. }
        )
    }
}
