//! Monthly apprentices report: municipal counts from five sheets, joined on
//! a master catalog of municipalities and rolled up per department.

use metagrid_engine::geocode::municipality_code;
use metagrid_engine::{FieldWarning, GridSource, Table, Value};
use serde::Serialize;

use crate::aggregate::{detail_totals, rollup};
use crate::catalog::build_catalog;
use crate::error::ReconError;
use crate::layout::ReportLayout;
use crate::model::{MetricTable, RollupRow};
use crate::reconcile::{find_source, left_join_fill_zero};
use crate::sources::extract_sheet;

pub const APPRENTICE_METRICS: &[&str] = &[
    "doble_titulacion",
    "formacion_titulada",
    "formacion_complementaria",
    "formacion_integral",
    "virtualidad",
    "bilinguismo",
    "victimas",
    "discapacidad",
    "mujer_cabeza_familia",
    "tercera_edad",
    "indigena",
];

/// Always empty; no source carries apprenticeship contracts yet.
pub const CONTRACT_COLUMN: &str = "contrato_aprendizaje";

/// Output column order after the three leading identity columns.
const VALUE_COLUMNS: &[&str] = &[
    "doble_titulacion",
    "formacion_titulada",
    "formacion_complementaria",
    "formacion_integral",
    "virtualidad",
    "bilinguismo",
    CONTRACT_COLUMN,
    "victimas",
    "discapacidad",
    "mujer_cabeza_familia",
    "tercera_edad",
    "indigena",
];

pub const APPRENTICE_COLUMNS: &[&str] = &["departamento", "municipio", "codigo_divipola"];

#[derive(Debug, Clone, Serialize)]
pub struct ApprenticesReport {
    pub metrics: Vec<String>,
    /// Department aggregates interleaved with their municipalities.
    pub rows: Vec<RollupRow>,
    /// National totals over municipality rows.
    pub totals: Vec<i64>,
    pub municipalities: usize,
    pub departments: usize,
    pub invalid_keys: usize,
    pub warnings: Vec<FieldWarning>,
}

pub fn build_apprentices(
    source: &mut dyn GridSource,
    layout: &ReportLayout,
) -> Result<ApprenticesReport, ReconError> {
    let mut tables: Vec<MetricTable<(i64, i64)>> = Vec::with_capacity(layout.sheets.len());
    let mut catalogs = Vec::with_capacity(layout.sheets.len());
    let mut warnings = Vec::new();
    let mut invalid_keys = 0;

    for sheet in &layout.sheets {
        let grid = source.read_grid(&sheet.sheet)?;
        let extract = extract_sheet::<(i64, i64)>(&grid, sheet)?;
        tracing::info!(sheet = %sheet.sheet, rows = extract.table.len(), "sheet read");
        warnings.extend(extract.warnings);
        invalid_keys += extract.invalid_keys;
        catalogs.push(extract.catalog);
        tables.push(extract.table);
    }

    let catalog = build_catalog(catalogs);
    let sources: Vec<&MetricTable<(i64, i64)>> = tables.iter().collect();
    let keys: Vec<(i64, i64)> = catalog.iter().map(|r| r.key).collect();

    let mut columns = Vec::with_capacity(APPRENTICE_METRICS.len());
    for metric in APPRENTICE_METRICS {
        let table = find_source(&sources, metric)?;
        columns.push(left_join_fill_zero(&keys, table, metric)?);
    }

    let details: Vec<RollupRow> = catalog
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            let (dept, mpio) = record.key;
            RollupRow {
                parent_code: dept,
                child_code: mpio,
                parent_name: record.name(0).map(String::from),
                child_name: record.name(1).map(String::from),
                geo: municipality_code(&dept, &mpio),
                metrics: columns.iter().map(|col| col[i]).collect(),
                is_aggregate: false,
            }
        })
        .collect();

    let municipalities = details.len();
    let invalid_geo = details.iter().filter(|d| !d.geo.is_valid()).count();
    if invalid_geo > 0 {
        tracing::warn!(rows = invalid_geo, "municipality codes could not be formatted");
    }

    let rows = rollup(details);
    let departments = rows.iter().filter(|r| r.is_aggregate).count();
    let totals = detail_totals(&rows);
    tracing::info!(municipalities, departments, "apprentices report built");

    Ok(ApprenticesReport {
        metrics: APPRENTICE_METRICS.iter().map(|m| m.to_string()).collect(),
        rows,
        totals,
        municipalities,
        departments,
        invalid_keys,
        warnings,
    })
}

impl ApprenticesReport {
    pub fn to_table(&self) -> Table {
        let columns = APPRENTICE_COLUMNS.iter().chain(VALUE_COLUMNS).copied();
        let mut table = Table::new(columns);
        let slots: Vec<Option<usize>> = VALUE_COLUMNS
            .iter()
            .map(|c| self.metrics.iter().position(|m| m == c))
            .collect();

        for row in &self.rows {
            let mut values = vec![
                row.parent_name.clone().into(),
                row.child_name.clone().into(),
                Value::Text(row.geo.to_string()),
            ];
            values.extend(slots.iter().map(|slot| match slot {
                Some(i) => Value::Integer(row.metrics.get(*i).copied().unwrap_or(0)),
                None => Value::Null,
            }));
            table.push(values, row.is_aggregate);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metagrid_engine::grid::grid_from_strs;
    use metagrid_engine::GridSet;

    const HEADER: &[&str] = &["COD DEPTO", "DEPARTAMENTO", "COD MPIO", "MUNICIPIO"];

    fn sheet(name: &str, labels: &[&str], rows: &[&[&str]]) -> metagrid_engine::Grid {
        let header: Vec<&str> = HEADER.iter().chain(labels).copied().collect();
        let mut all: Vec<&[&str]> = vec![header.as_slice()];
        all.extend_from_slice(rows);
        grid_from_strs(name, &all)
    }

    fn layout() -> ReportLayout {
        ReportLayout::from_toml(
            r#"
name = "aprendices"

[[sheets]]
sheet = "A"
header = { keywords = ["DEPARTAMENTO"] }
keys = [{ name = "codigo_depto", fallback = 0 }, { name = "codigo_mpio", fallback = 2 }]
names = [{ name = "nombre_depto", fallback = 1 }, { name = "nombre_mpio", fallback = 3 }]
metrics = [
  { name = "doble_titulacion", fallback = 4 },
  { name = "formacion_titulada", fallback = 5 },
  { name = "formacion_complementaria", fallback = 6 },
  { name = "formacion_integral", fallback = 7 },
  { name = "virtualidad", fallback = 8 },
  { name = "bilinguismo", fallback = 9 },
]

[[sheets]]
sheet = "B"
header = { keywords = ["DEPARTAMENTO"] }
keys = [{ name = "codigo_depto", fallback = 0 }, { name = "codigo_mpio", fallback = 2 }]
names = [{ name = "nombre_depto", fallback = 1 }, { name = "nombre_mpio", fallback = 3 }]
metrics = [
  { name = "victimas", fallback = 4 },
  { name = "discapacidad", fallback = 5 },
  { name = "mujer_cabeza_familia", fallback = 6 },
  { name = "tercera_edad", fallback = 7 },
  { name = "indigena", fallback = 8 },
]
"#,
        )
        .unwrap()
    }

    fn source() -> GridSet {
        let a = sheet(
            "A",
            &["DT", "FT", "FC", "FI", "VI", "BI"],
            &[
                &["5", "ANTIOQUIA", "1", "MEDELLIN", "1", "2", "3", "4", "5", "6"],
                &["5", "ANTIOQUIA", "2", "ABEJORRAL", "1", "1", "1", "1", "1", "1"],
            ],
        );
        let b = sheet(
            "B",
            &["VIC", "DIS", "MCF", "TE", "IND"],
            &[
                &["5", "", "2", "", "10", "0", "0", "0", "0"],
                &["91", "AMAZONAS", "1", "LETICIA", "7", "1", "1", "1", "1"],
            ],
        );
        GridSet::new(vec![a, b])
    }

    #[test]
    fn catalog_union_with_zero_fill_and_rollup() {
        let report = build_apprentices(&mut source(), &layout()).unwrap();
        assert_eq!(report.municipalities, 3);
        assert_eq!(report.departments, 2);
        assert_eq!(report.rows.len(), 5);

        let dept = &report.rows[0];
        assert!(dept.is_aggregate);
        assert_eq!(dept.parent_name.as_deref(), Some("ANTIOQUIA"));
        assert_eq!(dept.metrics[0], 2);
        assert_eq!(dept.metrics[6], 10);

        // ABEJORRAL sorts before MEDELLIN; its name survives the blank row in B
        assert_eq!(report.rows[1].child_name.as_deref(), Some("ABEJORRAL"));
        assert_eq!(report.rows[1].metrics[6], 10);
        assert_eq!(report.rows[2].geo.as_str(), "05001");

        let leticia = &report.rows[4];
        assert_eq!(leticia.metrics[0], 0);
        assert_eq!(leticia.metrics[6], 7);
        assert_eq!(report.totals[6], 17);
        assert_eq!(report.totals[0], 2);
    }

    #[test]
    fn table_keeps_empty_contract_column() {
        let report = build_apprentices(&mut source(), &layout()).unwrap();
        let table = report.to_table();
        assert_eq!(table.columns.len(), 15);
        assert_eq!(table.columns[9], CONTRACT_COLUMN);
        assert!(table.column_values(CONTRACT_COLUMN).iter().all(|v| v.is_null()));
        assert_eq!(table.emphasized, vec![true, false, false, true, false]);
        assert_eq!(table.rows[0][1], Value::Null);
        assert_eq!(table.rows[0][2], Value::Text("05000".into()));
        assert_eq!(table.rows[3][0], Value::Text("AMAZONAS".into()));
    }

    #[test]
    fn missing_sheet_is_structural() {
        let mut only_a = GridSet::new(vec![sheet("A", &[], &[])]);
        match build_apprentices(&mut only_a, &layout()) {
            Err(ReconError::Engine(e)) => assert!(e.is_structural()),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
