//! Turn one laid-out sheet into a keyed metric table plus catalog records.

use std::collections::BTreeSet;

use metagrid_engine::coerce::{to_code, to_measure, to_text};
use metagrid_engine::{ColumnMap, FieldWarning, Grid, HeaderRow};

use crate::error::ReconError;
use crate::layout::SheetLayout;
use crate::model::{CatalogRecord, MetricTable};

/// Row key assembled from the integer code columns of a sheet.
pub trait SheetKey: Ord + Clone + Sized {
    const ARITY: usize;

    fn from_parts(parts: &[i64]) -> Option<Self>;
}

impl SheetKey for i64 {
    const ARITY: usize = 1;

    fn from_parts(parts: &[i64]) -> Option<Self> {
        match parts {
            [code] => Some(*code),
            _ => None,
        }
    }
}

impl SheetKey for (i64, i64) {
    const ARITY: usize = 2;

    fn from_parts(parts: &[i64]) -> Option<Self> {
        match parts {
            [parent, child] => Some((*parent, *child)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SheetExtract<K: Ord + Clone> {
    pub table: MetricTable<K>,
    pub catalog: Vec<CatalogRecord<K>>,
    pub warnings: Vec<FieldWarning>,
    /// Rows with a non-empty key cell that is not an integer code.
    pub invalid_keys: usize,
}

pub fn extract_sheet<K: SheetKey>(
    grid: &Grid,
    layout: &SheetLayout,
) -> Result<SheetExtract<K>, ReconError> {
    if layout.keys.len() != K::ARITY {
        return Err(ReconError::ConfigValidation(format!(
            "sheet '{}': expected {} key field(s), layout has {}",
            layout.sheet,
            K::ARITY,
            layout.keys.len()
        )));
    }

    let header = HeaderRow::from_grid(grid, layout.header.locate(grid)?);
    let columns = ColumnMap::resolve(&grid.name, &header, &layout.fields());

    let mut table = MetricTable::new(&layout.sheet, layout.metric_names());
    let mut catalog = Vec::new();
    let mut seen: BTreeSet<(K, Vec<Option<String>>)> = BTreeSet::new();
    let mut invalid_keys = 0usize;
    let mut blank = 0usize;

    for row in header.data_start()..grid.height() {
        let key_cells: Vec<_> = layout
            .keys
            .iter()
            .map(|k| columns.cell(grid, row, &k.name))
            .collect();
        if key_cells.iter().all(|c| c.is_empty()) {
            blank += 1;
            continue;
        }
        let parts: Option<Vec<i64>> = key_cells.iter().map(|c| to_code(c)).collect();
        let Some(key) = parts.as_deref().and_then(K::from_parts) else {
            // subtotal rows and stray notes land here
            invalid_keys += 1;
            continue;
        };

        let names: Vec<Option<String>> = layout
            .names
            .iter()
            .map(|n| to_text(columns.cell(grid, row, &n.name)))
            .collect();
        let values = layout
            .metrics
            .iter()
            .map(|m| to_measure(columns.cell(grid, row, &m.name)).unwrap_or(0))
            .collect();

        table.insert(key.clone(), values);
        // every distinct spelling goes to the catalog; the metric table keeps
        // the first row
        if seen.insert((key.clone(), names.clone())) {
            catalog.push(CatalogRecord::new(key, names));
        }
    }

    tracing::debug!(
        sheet = %grid.name,
        header_row = header.index,
        rows = table.len(),
        blank,
        invalid_keys,
        duplicates = table.duplicates,
        "sheet extracted"
    );
    if invalid_keys > 0 {
        tracing::warn!(sheet = %grid.name, invalid_keys, "rows with non-numeric codes were skipped");
    }

    Ok(SheetExtract {
        table,
        catalog,
        warnings: columns.warnings().to_vec(),
        invalid_keys,
    })
}
