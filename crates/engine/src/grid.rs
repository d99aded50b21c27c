use chrono::NaiveDateTime;

use crate::error::EngineError;

/// A single decoded spreadsheet value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    /// Empty cells and whitespace-only text both count as null.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Display text used for header labels and keyword scans.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Cell::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Cell::Date(dt) => {
                if dt.time() == chrono::NaiveTime::MIN {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
                }
            }
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n as f64)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// One decoded sheet: name plus a ragged row-major array of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { name: name.into(), rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    /// Out-of-range reads yield `Cell::Empty`.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        self.rows.get(row).map(|r| r.as_slice()).unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Anything that can hand out decoded sheets by name.
pub trait GridSource {
    fn sheet_names(&self) -> Vec<String>;

    /// Read a sheet by its exact name.
    fn read_sheet(&mut self, name: &str) -> Result<Grid, EngineError>;

    /// Read a sheet, tolerating stray whitespace and case in the name.
    fn read_grid(&mut self, wanted: &str) -> Result<Grid, EngineError> {
        let available = self.sheet_names();
        match resolve_sheet_name(&available, wanted) {
            Some(name) => self.read_sheet(&name),
            None => Err(EngineError::SheetMissing {
                sheet: wanted.to_string(),
                available,
            }),
        }
    }

    /// First sheet of the workbook.
    fn first_grid(&mut self) -> Result<Grid, EngineError> {
        let available = self.sheet_names();
        match available.first() {
            Some(name) => {
                let name = name.clone();
                self.read_sheet(&name)
            }
            None => Err(EngineError::SheetMissing {
                sheet: "<first>".into(),
                available,
            }),
        }
    }
}

/// Exact match first, then trimmed case-insensitive match.
pub fn resolve_sheet_name(available: &[String], wanted: &str) -> Option<String> {
    if let Some(exact) = available.iter().find(|n| n.as_str() == wanted) {
        return Some(exact.clone());
    }
    let wanted_norm = wanted.trim().to_uppercase();
    available
        .iter()
        .find(|n| n.trim().to_uppercase() == wanted_norm)
        .cloned()
}

/// In-memory source, used by tests and by callers that decode grids themselves.
#[derive(Debug, Default, Clone)]
pub struct GridSet {
    grids: Vec<Grid>,
}

impl GridSet {
    pub fn new(grids: Vec<Grid>) -> Self {
        Self { grids }
    }

    pub fn push(&mut self, grid: Grid) {
        self.grids.push(grid);
    }
}

impl GridSource for GridSet {
    fn sheet_names(&self) -> Vec<String> {
        self.grids.iter().map(|g| g.name.clone()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Grid, EngineError> {
        self.grids
            .iter()
            .find(|g| g.name == name)
            .cloned()
            .ok_or_else(|| EngineError::SheetMissing {
                sheet: name.to_string(),
                available: self.sheet_names(),
            })
    }
}

/// Build a grid from string literals; empty strings become `Cell::Empty`,
/// strings that parse as numbers become `Cell::Number`.
pub fn grid_from_strs(name: &str, rows: &[&[&str]]) -> Grid {
    let rows = rows
        .iter()
        .map(|r| {
            r.iter()
                .map(|s| {
                    if s.is_empty() {
                        Cell::Empty
                    } else if let Ok(n) = s.parse::<f64>() {
                        Cell::Number(n)
                    } else {
                        Cell::Text(s.to_string())
                    }
                })
                .collect()
        })
        .collect();
    Grid::new(name, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_is_empty() {
        let g = grid_from_strs("s", &[&["a", "1"]]);
        assert_eq!(g.cell(0, 1), &Cell::Number(1.0));
        assert_eq!(g.cell(0, 5), &Cell::Empty);
        assert_eq!(g.cell(9, 0), &Cell::Empty);
        assert_eq!(g.width(), 2);
    }

    #[test]
    fn number_text_drops_integral_fraction() {
        assert_eq!(Cell::Number(12.0).text(), "12");
        assert_eq!(Cell::Number(1.5).text(), "1.5");
        assert_eq!(Cell::Text("  x ".into()).text(), "x");
    }

    #[test]
    fn sheet_lookup_tolerates_trailing_space() {
        let names = vec!["NIVEL REGIONAL ".to_string(), "Otra".to_string()];
        assert_eq!(
            resolve_sheet_name(&names, "NIVEL REGIONAL").as_deref(),
            Some("NIVEL REGIONAL ")
        );
        assert_eq!(resolve_sheet_name(&names, "otra").as_deref(), Some("Otra"));
        assert!(resolve_sheet_name(&names, "missing").is_none());
    }

    #[test]
    fn grid_set_reports_missing_sheet() {
        let mut set = GridSet::new(vec![grid_from_strs("A", &[&["x"]])]);
        let err = set.read_grid("B").unwrap_err();
        assert!(matches!(err, EngineError::SheetMissing { .. }));
        assert!(err.is_structural());
    }
}
