//! Declarative sheet layouts for report inputs.
//!
//! Each report reads a fixed set of sheets; a layout names the sheet, how to
//! find its header, and the key, name and metric fields to resolve. The
//! default layouts are compiled in and can be replaced by a TOML file.

use std::collections::HashSet;

use metagrid_engine::{FieldSpec, HeaderRule};
use serde::Deserialize;

use crate::error::ReconError;

pub const CAPACITY_LAYOUT: &str = include_str!("../layouts/capacity.toml");
pub const APPRENTICES_LAYOUT: &str = include_str!("../layouts/apprentices.toml");

// ---------------------------------------------------------------------------
// Layout types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReportLayout {
    pub name: String,
    pub sheets: Vec<SheetLayout>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetLayout {
    pub sheet: String,
    pub header: HeaderRule,
    /// Code parts of the row key, outermost first.
    pub keys: Vec<FieldSpec>,
    /// Display names carried into the master catalog.
    #[serde(default)]
    pub names: Vec<FieldSpec>,
    pub metrics: Vec<FieldSpec>,
}

impl SheetLayout {
    pub fn fields(&self) -> Vec<FieldSpec> {
        self.keys
            .iter()
            .chain(&self.names)
            .chain(&self.metrics)
            .cloned()
            .collect()
    }

    pub fn metric_names(&self) -> Vec<String> {
        self.metrics.iter().map(|m| m.name.clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Parsing & validation
// ---------------------------------------------------------------------------

impl ReportLayout {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let layout: ReportLayout =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn capacity() -> Result<Self, ReconError> {
        Self::from_toml(CAPACITY_LAYOUT)
    }

    pub fn apprentices() -> Result<Self, ReconError> {
        Self::from_toml(APPRENTICES_LAYOUT)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let Some(first) = self.sheets.first() else {
            return Err(ReconError::ConfigValidation(format!(
                "layout '{}' declares no sheets",
                self.name
            )));
        };

        let mut metrics = HashSet::new();
        for sheet in &self.sheets {
            if sheet.keys.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "sheet '{}': at least one key field is required",
                    sheet.sheet
                )));
            }
            if sheet.keys.len() != first.keys.len() || sheet.names.len() != first.names.len() {
                return Err(ReconError::ConfigValidation(format!(
                    "sheet '{}': key/name fields must match sheet '{}'",
                    sheet.sheet, first.sheet
                )));
            }
            for field in sheet.fields() {
                if field.is_positional() && field.fallback.is_none() {
                    return Err(ReconError::ConfigValidation(format!(
                        "sheet '{}': field '{}' has neither a matcher nor a fallback",
                        sheet.sheet, field.name
                    )));
                }
            }
            for m in &sheet.metrics {
                if !metrics.insert(m.name.clone()) {
                    return Err(ReconError::ConfigValidation(format!(
                        "metric '{}' is declared by more than one sheet",
                        m.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// All metric names in sheet order.
    pub fn metric_names(&self) -> Vec<String> {
        self.sheets.iter().flat_map(|s| s.metric_names()).collect()
    }
}
