// Excel workbook reading (xlsx, xlsb, xls, ods) via calamine

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use chrono::NaiveDateTime;

use metagrid_engine::coerce::excel_serial_to_datetime;
use metagrid_engine::{Cell, EngineError, Grid, GridSource};

/// An opened workbook serving decoded sheets to the engine.
pub struct Workbook {
    path: PathBuf,
    sheets: Sheets<BufReader<File>>,
}

impl Workbook {
    pub fn open(path: &Path) -> Result<Self, EngineError> {
        let sheets = open_workbook_auto(path).map_err(|e| {
            EngineError::Source(format!("failed to open '{}': {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "workbook opened");
        Ok(Self {
            path: path.to_path_buf(),
            sheets,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GridSource for Workbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names().to_vec()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Grid, EngineError> {
        let range = self.sheets.worksheet_range(name).map_err(|e| {
            EngineError::Source(format!(
                "failed to read sheet '{}' from '{}': {}",
                name,
                self.path.display(),
                e
            ))
        })?;
        let grid = range_to_grid(name, &range);
        tracing::debug!(sheet = name, rows = grid.height(), cols = grid.width(), "sheet decoded");
        Ok(grid)
    }
}

/// calamine ranges start at the first used cell; pad so grid indices are
/// absolute sheet positions.
fn range_to_grid(name: &str, range: &Range<Data>) -> Grid {
    let (row0, col0) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row0];
    for source_row in range.rows() {
        let mut row = vec![Cell::Empty; col0];
        row.extend(source_row.iter().map(data_to_cell));
        while matches!(row.last(), Some(Cell::Empty)) {
            row.pop();
        }
        rows.push(row);
    }
    Grid::new(name, rows)
}

pub fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.clone())
            }
        }
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Bool(*b),
        // #N/A, #DIV/0! and friends read as missing
        Data::Error(_) => Cell::Empty,
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match excel_serial_to_datetime(serial) {
                Some(d) => Cell::Date(d),
                None => Cell::Number(serial),
            }
        }
        Data::DateTimeIso(s) => match NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
            Ok(d) => Cell::Date(d),
            Err(_) => Cell::Text(s.clone()),
        },
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_variants_map_to_cells() {
        assert_eq!(data_to_cell(&Data::Empty), Cell::Empty);
        assert_eq!(data_to_cell(&Data::String("  ".into())), Cell::Empty);
        assert_eq!(data_to_cell(&Data::String("Cauca".into())), Cell::Text("Cauca".into()));
        assert_eq!(data_to_cell(&Data::Int(7)), Cell::Number(7.0));
        assert_eq!(data_to_cell(&Data::Float(2.5)), Cell::Number(2.5));
        assert_eq!(data_to_cell(&Data::Bool(true)), Cell::Bool(true));
        assert_eq!(
            data_to_cell(&Data::Error(calamine::CellErrorType::NA)),
            Cell::Empty
        );
        match data_to_cell(&Data::DateTimeIso("2025-09-30T00:00:00".into())) {
            Cell::Date(d) => assert_eq!(d.format("%Y-%m-%d").to_string(), "2025-09-30"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn offset_ranges_keep_absolute_positions() {
        let mut range: Range<Data> = Range::new((2, 1), (3, 2));
        range.set_value((2, 1), Data::String("COD".into()));
        range.set_value((3, 2), Data::Float(5.0));
        let grid = range_to_grid("S", &range);
        assert_eq!(grid.height(), 4);
        assert_eq!(grid.cell(2, 1), &Cell::Text("COD".into()));
        assert_eq!(grid.cell(3, 2), &Cell::Number(5.0));
        assert_eq!(grid.cell(0, 0), &Cell::Empty);
    }

    #[test]
    fn missing_file_is_a_source_error() {
        let err = Workbook::open(Path::new("/nonexistent/avance.xlsb")).err();
        assert!(matches!(err, Some(EngineError::Source(_))));
    }
}
