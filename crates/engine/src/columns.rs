//! Column resolution by label with positional fallback.
//!
//! Fragile label matching is confined to this module: a sheet's header is
//! resolved once against a list of [`FieldSpec`]s into a [`ColumnMap`], and
//! everything downstream reads cells by logical field name.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::{Cell, Grid};
use crate::header::HeaderRow;

/// Declarative description of one logical field.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// All substrings must appear in the label.
    #[serde(default)]
    pub required: Vec<String>,
    /// Alternative substring sets; any one fully matching is enough.
    #[serde(default)]
    pub any_of: Vec<Vec<String>>,
    /// Whole-label match.
    #[serde(default)]
    pub exact: Option<String>,
    #[serde(default)]
    pub fallback: Option<usize>,
}

impl FieldSpec {
    pub fn exact(name: &str, label: &str) -> Self {
        Self {
            name: name.into(),
            exact: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn contains(name: &str, substrings: &[&str], fallback: usize) -> Self {
        Self {
            name: name.into(),
            required: substrings.iter().map(|s| s.to_string()).collect(),
            fallback: Some(fallback),
            ..Default::default()
        }
    }

    pub fn positional(name: &str, index: usize) -> Self {
        Self {
            name: name.into(),
            fallback: Some(index),
            ..Default::default()
        }
    }

    pub fn or_contains(mut self, substrings: &[&str]) -> Self {
        self.any_of.push(substrings.iter().map(|s| s.to_string()).collect());
        self
    }

    /// A spec without any label matcher resolves straight to its fallback.
    pub fn is_positional(&self) -> bool {
        self.required.is_empty() && self.any_of.is_empty() && self.exact.is_none()
    }

    /// `label` is expected already normalized (trimmed, upper-cased).
    pub fn matches(&self, label: &str) -> bool {
        if label.is_empty() {
            return false;
        }
        if let Some(ref exact) = self.exact {
            if label == exact.trim().to_uppercase() {
                return true;
            }
        }
        let all_in = |set: &[String]| {
            !set.is_empty() && set.iter().all(|s| label.contains(s.to_uppercase().as_str()))
        };
        all_in(&self.required) || self.any_of.iter().any(|set| all_in(set))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Matched(usize),
    Fallback(usize),
    Positional(usize),
    Unresolved,
}

impl Resolution {
    pub fn index(&self) -> Option<usize> {
        match self {
            Resolution::Matched(i) | Resolution::Fallback(i) | Resolution::Positional(i) => Some(*i),
            Resolution::Unresolved => None,
        }
    }
}

/// Left-to-right scan; the first qualifying column wins.
pub fn resolve_column(header: &HeaderRow, spec: &FieldSpec) -> Resolution {
    if spec.is_positional() {
        return match spec.fallback {
            Some(i) => Resolution::Positional(i),
            None => Resolution::Unresolved,
        };
    }
    if let Some(idx) = header.labels.iter().position(|l| spec.matches(l)) {
        return Resolution::Matched(idx);
    }
    match spec.fallback {
        Some(i) => Resolution::Fallback(i),
        None => Resolution::Unresolved,
    }
}

/// A named field whose label could not be found in the header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldWarning {
    pub sheet: String,
    pub field: String,
    pub fallback: Option<usize>,
}

impl fmt::Display for FieldWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fallback {
            Some(i) => write!(
                f,
                "sheet '{}': column for '{}' not found by name, using index {}",
                self.sheet, self.field, i
            ),
            None => write!(
                f,
                "sheet '{}': column for '{}' not found, field left empty",
                self.sheet, self.field
            ),
        }
    }
}

/// Typed name → index mapping for one sheet.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    index: HashMap<String, usize>,
    warnings: Vec<FieldWarning>,
}

impl ColumnMap {
    pub fn resolve(sheet: &str, header: &HeaderRow, specs: &[FieldSpec]) -> Self {
        let mut map = ColumnMap::default();
        for spec in specs {
            let resolution = resolve_column(header, spec);
            match resolution {
                Resolution::Matched(_) | Resolution::Positional(_) => {}
                Resolution::Fallback(_) | Resolution::Unresolved => {
                    let warning = FieldWarning {
                        sheet: sheet.to_string(),
                        field: spec.name.clone(),
                        fallback: resolution.index(),
                    };
                    tracing::warn!("{warning}");
                    map.warnings.push(warning);
                }
            }
            if let Some(i) = resolution.index() {
                map.index.insert(spec.name.clone(), i);
            }
        }
        map
    }

    pub fn get(&self, field: &str) -> Option<usize> {
        self.index.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.index.contains_key(field)
    }

    /// Cell of `field` in `row`; unresolved fields read as empty.
    pub fn cell<'g>(&self, grid: &'g Grid, row: usize, field: &str) -> &'g Cell {
        match self.get(field) {
            Some(col) => grid.cell(row, col),
            None => grid.cell(usize::MAX, 0),
        }
    }

    pub fn warnings(&self) -> &[FieldWarning] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> HeaderRow {
        HeaderRow::from_labels(&["CODE", "NAME", "FORMACION TITULADA TOTAL", "OTRO TOTAL"])
    }

    #[test]
    fn all_substrings_must_match() {
        let spec = FieldSpec::contains("titulada", &["FORMACION TITULADA", "TOTAL"], 36);
        assert_eq!(resolve_column(&header(), &spec), Resolution::Matched(2));
    }

    #[test]
    fn first_match_wins() {
        let spec = FieldSpec::contains("total", &["TOTAL"], 9);
        assert_eq!(resolve_column(&header(), &spec), Resolution::Matched(2));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let spec = FieldSpec::contains("name", &["name"], 9);
        assert_eq!(resolve_column(&header(), &spec), Resolution::Matched(1));
    }

    #[test]
    fn unmatched_field_falls_back_with_warning() {
        let specs = vec![
            FieldSpec::contains("victimas", &["VICTIMA", "TOTAL"], 27),
            FieldSpec::contains("code", &["CODE"], 0),
        ];
        let map = ColumnMap::resolve("POBL", &header(), &specs);
        assert_eq!(map.get("victimas"), Some(27));
        assert_eq!(map.get("code"), Some(0));
        assert_eq!(map.warnings().len(), 1);
        assert_eq!(map.warnings()[0].field, "victimas");
        assert!(map.warnings()[0].to_string().contains("index 27"));
    }

    #[test]
    fn positional_spec_does_not_warn() {
        let map = ColumnMap::resolve("S", &header(), &[FieldSpec::positional("codigo_depto", 0)]);
        assert_eq!(map.get("codigo_depto"), Some(0));
        assert!(map.warnings().is_empty());
    }

    #[test]
    fn exact_label_avoids_prefix_collisions() {
        let h = HeaderRow::from_labels(&["CODIGO_PROGRAMA_ESPECIAL", "CODIGO_PROGRAMA"]);
        let spec = FieldSpec::exact("programa", "codigo_programa");
        assert_eq!(resolve_column(&h, &spec), Resolution::Matched(1));
    }

    #[test]
    fn alternatives_match_any_set() {
        let h = HeaderRow::from_labels(&["X", "ADULTO MAYOR TOTAL"]);
        let spec = FieldSpec::contains("tercera_edad", &["TERCERA EDAD"], 58).or_contains(&["ADULTO", "MAYOR"]);
        assert_eq!(resolve_column(&h, &spec), Resolution::Matched(1));
    }

    #[test]
    fn unresolved_without_fallback_reads_empty() {
        let g = crate::grid::grid_from_strs("S", &[&["A"], &["1"]]);
        let h = HeaderRow::from_grid(&g, 0);
        let map = ColumnMap::resolve("S", &h, &[FieldSpec::exact("b", "B")]);
        assert!(!map.contains("b"));
        assert_eq!(map.cell(&g, 1, "b"), &Cell::Empty);
        assert_eq!(map.warnings()[0].fallback, None);
    }
}
