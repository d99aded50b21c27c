//! Header row detection for exports whose title block varies month to month.

use serde::Deserialize;

use crate::error::EngineError;
use crate::grid::Grid;

/// Number of leading rows scanned for a header.
pub const HEADER_SCAN_ROWS: usize = 20;

/// Index of the first row (within the scan window) whose joined cell text
/// contains any of `keywords`, compared case-insensitively.
pub fn locate_header(grid: &Grid, keywords: &[&str]) -> Result<usize, EngineError> {
    let needles: Vec<String> = keywords.iter().map(|k| k.to_uppercase()).collect();

    for (idx, row) in grid.rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
        let joined = row
            .iter()
            .filter(|c| !c.is_empty())
            .map(|c| c.text().to_uppercase())
            .collect::<Vec<_>>()
            .join(" ");
        if needles.iter().any(|n| joined.contains(n.as_str())) {
            tracing::debug!(sheet = %grid.name, row = idx, "header located");
            return Ok(idx);
        }
    }

    Err(EngineError::HeaderNotFound {
        sheet: grid.name.clone(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    })
}

/// How a layout finds its header row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderRule {
    /// Keyword scan over the first [`HEADER_SCAN_ROWS`] rows.
    Keywords(Vec<String>),
    /// Known header row index.
    Fixed(usize),
}

impl HeaderRule {
    pub fn locate(&self, grid: &Grid) -> Result<usize, EngineError> {
        match self {
            HeaderRule::Keywords(words) => {
                let words: Vec<&str> = words.iter().map(|w| w.as_str()).collect();
                locate_header(grid, &words)
            }
            HeaderRule::Fixed(row) => {
                if *row < grid.height() {
                    Ok(*row)
                } else {
                    Err(EngineError::HeaderNotFound {
                        sheet: grid.name.clone(),
                        keywords: vec![format!("<row {row}>")],
                    })
                }
            }
        }
    }
}

/// Normalized labels of a located header row.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRow {
    pub index: usize,
    /// Trimmed, upper-cased; empty string for blank header cells.
    pub labels: Vec<String>,
}

impl HeaderRow {
    pub fn from_grid(grid: &Grid, index: usize) -> Self {
        let labels = grid
            .row(index)
            .iter()
            .map(|c| c.text().trim().to_uppercase())
            .collect();
        Self { index, labels }
    }

    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        Self {
            index: 0,
            labels: labels.iter().map(|l| l.as_ref().trim().to_uppercase()).collect(),
        }
    }

    /// First data row after the header.
    pub fn data_start(&self) -> usize {
        self.index + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::grid_from_strs;

    #[test]
    fn finds_first_keyword_row() {
        let g = grid_from_strs(
            "PE-04",
            &[
                &["FORMACION NACIONAL"],
                &[""],
                &["codigo_regional", "nombre_regional"],
                &["IDENTIFICADOR_FICHA"],
            ],
        );
        assert_eq!(locate_header(&g, &["IDENTIFICADOR_FICHA", "CODIGO_REGIONAL"]).unwrap(), 2);
    }

    #[test]
    fn header_beyond_scan_window_is_not_found() {
        let mut rows: Vec<&[&str]> = vec![&["titulo"][..]; HEADER_SCAN_ROWS];
        rows.push(&["DEPARTAMENTO", "MUNICIPIO"]);
        let g = grid_from_strs("S", &rows);
        let err = locate_header(&g, &["DEPARTAMENTO"]).unwrap_err();
        assert!(matches!(err, EngineError::HeaderNotFound { .. }));
        assert!(err.to_string().contains("DEPARTAMENTO"));
    }

    #[test]
    fn empty_grid_is_not_found() {
        let g = grid_from_strs("S", &[]);
        assert!(locate_header(&g, &["X"]).is_err());
    }

    #[test]
    fn fixed_rule_checks_bounds() {
        let g = grid_from_strs("S", &[&["a"], &["b"]]);
        assert_eq!(HeaderRule::Fixed(1).locate(&g).unwrap(), 1);
        assert!(HeaderRule::Fixed(2).locate(&g).is_err());
    }

    #[test]
    fn labels_are_normalized() {
        let g = grid_from_strs("S", &[&[" codigo ", "", "Nombre"]]);
        let h = HeaderRow::from_grid(&g, 0);
        assert_eq!(h.labels, vec!["CODIGO", "", "NOMBRE"]);
        assert_eq!(h.data_start(), 1);
    }
}
