//! Remaining training capacity per regional: yearly quota goals minus the
//! month's progress.

use std::collections::BTreeMap;

use metagrid_engine::geocode::department_code;
use metagrid_engine::goals::{read_quotas, read_regions};
use metagrid_engine::{FieldWarning, GeoCode, GridSource, RelationalSink, Table, Value};
use serde::Serialize;

use crate::error::ReconError;
use crate::layout::ReportLayout;
use crate::model::{DeltaPair, MetricTable, Reconciliation};
use crate::reconcile::reconcile;
use crate::sources::extract_sheet;

/// Target metric and the goal subcategory it is read from.
pub const CAPACITY_TARGETS: &[(&str, &str)] = &[
    ("meta_tecnico_articulacion", "Técnico Laboral Articulación con la Media"),
    ("meta_formacion_titulada", "TOTAL FORMACION TITULADA"),
    ("meta_formacion_complementaria", "TOTAL FORMACION COMPLEMENTARIA"),
    ("meta_fpi_total", "TOTAL FORMACION PROFESIONAL INTEGRAL"),
    ("meta_fpi_virtual", "Total Formación Profesional Integral - Virtual"),
    ("meta_bilinguismo", "Total Programa de Bilingüismo"),
];

/// (target, achieved, output)
const PAIRS: &[(&str, &str, &str)] = &[
    ("meta_tecnico_articulacion", "avance_tec_articulacion", "cupos_doble_titulacion"),
    ("meta_formacion_titulada", "avance_formacion_titulada", "cupos_formacion_titulada"),
    (
        "meta_formacion_complementaria",
        "avance_formacion_complementaria",
        "cupos_formacion_complementaria",
    ),
    ("meta_fpi_total", "avance_fpi_total", "cupos_fpi_total"),
    ("meta_fpi_virtual", "avance_fpi_virtual", "cupos_virtualidad"),
    ("meta_bilinguismo", "avance_bilinguismo", "cupos_bilinguismo"),
];

pub fn capacity_pairs() -> Vec<DeltaPair> {
    PAIRS
        .iter()
        .map(|(t, a, o)| DeltaPair::new(t, a, o))
        .collect()
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CapacityTargets {
    pub year: i32,
    pub table: MetricTable<i64>,
    pub names: BTreeMap<i64, String>,
}

/// Per-regional targets for `year`, ordered by regional code.
///
/// Only regionals with at least one of the reconciled subcategories appear.
/// Where a subcategory has several values the largest wins; absent ones are
/// zero.
pub fn capacity_targets(sink: &dyn RelationalSink, year: i32) -> Result<CapacityTargets, ReconError> {
    let names: BTreeMap<i64, String> = read_regions(sink)?.into_iter().collect();

    let mut targets: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for quota in read_quotas(sink, year)? {
        let Some(slot) = CAPACITY_TARGETS
            .iter()
            .position(|(_, sub)| *sub == quota.subcategory)
        else {
            continue;
        };
        if !names.contains_key(&quota.region) {
            continue;
        }
        let row = targets
            .entry(quota.region)
            .or_insert_with(|| vec![0; CAPACITY_TARGETS.len()]);
        row[slot] = row[slot].max(quota.value);
    }

    let mut table = MetricTable::new("metas", CAPACITY_TARGETS.iter().map(|(m, _)| *m));
    for (code, values) in targets {
        table.insert(code, values);
    }
    tracing::info!(year, regionals = table.len(), "capacity targets loaded");

    Ok(CapacityTargets { year, table, names })
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CapacityRow {
    pub codigo_regional: i64,
    pub nombre_regional: Option<String>,
    pub codigo_divipola: GeoCode,
    pub remaining: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CapacityReport {
    pub year: i32,
    pub outputs: Vec<String>,
    pub rows: Vec<CapacityRow>,
    pub totals: Vec<i64>,
    pub excluded_keys: usize,
    pub invalid_keys: usize,
    pub warnings: Vec<FieldWarning>,
}

pub const CAPACITY_COLUMNS: &[&str] = &["codigo_regional", "nombre_regional", "codigo_divipola"];

/// Read the progress sheets named by `layout` and reconcile them against
/// `targets`.
pub fn build_capacity(
    targets: &CapacityTargets,
    source: &mut dyn GridSource,
    layout: &ReportLayout,
) -> Result<CapacityReport, ReconError> {
    let mut achieved = Vec::with_capacity(layout.sheets.len());
    let mut warnings = Vec::new();
    let mut invalid_keys = 0;
    for sheet in &layout.sheets {
        let grid = source.read_grid(&sheet.sheet)?;
        let extract = extract_sheet::<i64>(&grid, sheet)?;
        warnings.extend(extract.warnings);
        invalid_keys += extract.invalid_keys;
        achieved.push(extract.table);
    }

    let sources: Vec<&MetricTable<i64>> = achieved.iter().collect();
    let pairs = capacity_pairs();
    let reconciliation = reconcile(&targets.table, &sources, &pairs)?;
    let report = CapacityReport::from_reconciliation(targets, reconciliation, invalid_keys, warnings);

    tracing::info!(
        regionals = report.rows.len(),
        excluded = report.excluded_keys,
        warnings = report.warnings.len(),
        "capacity reconciled"
    );
    Ok(report)
}

impl CapacityReport {
    fn from_reconciliation(
        targets: &CapacityTargets,
        reconciliation: Reconciliation<i64>,
        invalid_keys: usize,
        warnings: Vec<FieldWarning>,
    ) -> Self {
        let totals = reconciliation.totals();
        let rows = reconciliation
            .rows
            .into_iter()
            .map(|r| CapacityRow {
                codigo_regional: r.key,
                nombre_regional: targets.names.get(&r.key).cloned(),
                codigo_divipola: department_code(&r.key),
                remaining: r.remaining,
            })
            .collect();
        Self {
            year: targets.year,
            outputs: reconciliation.pairs.into_iter().map(|p| p.output).collect(),
            rows,
            totals,
            excluded_keys: reconciliation.excluded_keys,
            invalid_keys,
            warnings,
        }
    }

    pub fn to_table(&self) -> Table {
        let columns = CAPACITY_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.outputs.iter().cloned());
        let mut table = Table::new(columns);
        for row in &self.rows {
            let mut values = vec![
                Value::Integer(row.codigo_regional),
                row.nombre_regional.clone().into(),
                Value::Text(row.codigo_divipola.to_string()),
            ];
            values.extend(row.remaining.iter().map(|v| Value::Integer(*v)));
            table.push(values, false);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metagrid_engine::goals::{persist_goals, GoalSet, QuotaGoal};
    use metagrid_engine::MemorySink;

    fn quota(region: i64, sub: &str, value: i64) -> QuotaGoal {
        let category = metagrid_engine::goals::QUOTA_COLUMNS
            .iter()
            .find(|(_, _, s)| *s == sub)
            .map(|(_, c, _)| c.to_string())
            .unwrap();
        QuotaGoal {
            region,
            category,
            subcategory: sub.into(),
            value,
        }
    }

    #[test]
    fn targets_cover_only_reconciled_subcategories() {
        let goals = GoalSet {
            regions: vec![(5, "ANTIOQUIA".into()), (8, "ATLÁNTICO".into()), (11, "DISTRITO CAPITAL".into())],
            quotas: vec![
                quota(5, "TOTAL FORMACION TITULADA", 1000),
                quota(5, "Total Programa de Bilingüismo", 300),
                quota(8, "Técnico Laboral Articulación con la Media", 40),
                quota(11, "Operarios Regular", 10),
            ],
            ..GoalSet::default()
        };
        let mut sink = MemorySink::new();
        persist_goals(&goals, &mut sink, 2025).unwrap();

        let t = capacity_targets(&sink, 2025).unwrap();
        assert_eq!(t.table.keys().copied().collect::<Vec<_>>(), vec![5, 8]);
        assert_eq!(t.table.value(&5, 1), Some(1000));
        assert_eq!(t.table.value(&5, 5), Some(300));
        assert_eq!(t.table.value(&5, 0), Some(0));
        assert_eq!(t.table.value(&8, 0), Some(40));
        assert_eq!(t.names.get(&8).map(String::as_str), Some("ATLÁNTICO"));

        assert!(capacity_targets(&sink, 2024).unwrap().table.is_empty());
    }

    #[test]
    fn table_has_fixed_leading_columns() {
        let mut table = MetricTable::new("metas", CAPACITY_TARGETS.iter().map(|(m, _)| *m));
        table.insert(5, vec![10, 20, 30, 40, 50, 60]);
        let targets = CapacityTargets {
            year: 2025,
            table,
            names: BTreeMap::from([(5, "ANTIOQUIA".to_string())]),
        };
        let mut tec = MetricTable::new("TEC ARTIC REG", ["avance_tec_articulacion"]);
        tec.insert(5, vec![15]);
        let others = MetricTable::new(
            "resto",
            [
                "avance_formacion_titulada",
                "avance_formacion_complementaria",
                "avance_fpi_total",
                "avance_fpi_virtual",
                "avance_bilinguismo",
            ],
        );
        let rec = reconcile(&targets.table, &[&tec, &others], &capacity_pairs()).unwrap();
        let report = CapacityReport::from_reconciliation(&targets, rec, 0, Vec::new());
        let t = report.to_table();
        assert_eq!(t.columns[..3], ["codigo_regional", "nombre_regional", "codigo_divipola"]);
        assert_eq!(t.columns[3], "cupos_doble_titulacion");
        assert_eq!(
            t.rows[0],
            vec![
                Value::Integer(5),
                Value::Text("ANTIOQUIA".into()),
                Value::Text("05000".into()),
                Value::Integer(-5),
                Value::Integer(20),
                Value::Integer(30),
                Value::Integer(40),
                Value::Integer(50),
                Value::Integer(60),
            ]
        );
        assert_eq!(report.totals, vec![-5, 20, 30, 40, 50, 60]);
    }
}
