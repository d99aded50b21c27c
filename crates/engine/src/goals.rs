//! Regional goals ("metas") workbook: fixed-layout extraction and
//! persistence into keyed goal tables.

use serde::Serialize;

use crate::coerce::{to_code, to_measure, to_text};
use crate::error::EngineError;
use crate::grid::{Cell, Grid};
use crate::sink::{MergePolicy, RelationalSink, SqlType, TableSchema};
use crate::value::Value;

pub const GOALS_SHEET: &str = "METAS FORMACION X REGIONAL";
/// The sheet has no header row; data starts here.
pub const GOALS_FIRST_ROW: usize = 3;
const CODE_COL: usize = 0;
const NAME_COL: usize = 1;

pub const REGIONS_TABLE: &str = "regionales_metas";
pub const CATEGORIES_TABLE: &str = "categorias_formacion";
pub const QUOTAS_TABLE: &str = "metas_cupos";
pub const RETENTION_TABLE: &str = "metas_retencion";
pub const CERTIFICATION_TABLE: &str = "metas_certificacion";

/// Quota columns: (column, category, subcategory).
pub const QUOTA_COLUMNS: &[(usize, &str, &str)] = &[
    (2, "EDUCACION SUPERIOR", "Tecnologos Regular - Presencial"),
    (3, "EDUCACION SUPERIOR", "Tecnólogos Regular - Virtual"),
    (4, "EDUCACION SUPERIOR", "Tecnólogos Regular - A Distancia"),
    (5, "EDUCACION SUPERIOR", "Tecnólogos CampeSENA"),
    (6, "EDUCACION SUPERIOR", "Tecnólogos Full Popular"),
    (7, "EDUCACION SUPERIOR", "Total Tecnólogos"),
    (8, "EDUCACION SUPERIOR", "TOTAL EDUCACION SUPERIOR"),
    (9, "FORMACION LABORAL", "Operarios Regular"),
    (10, "FORMACION LABORAL", "Operarios CampeSENA"),
    (11, "FORMACION LABORAL", "Operarios Full Popular"),
    (12, "FORMACION LABORAL", "Total Operarios"),
    (13, "FORMACION LABORAL", "Auxiliares Regular"),
    (14, "FORMACION LABORAL", "Auxiliares CampeSENA"),
    (15, "FORMACION LABORAL", "Auxiliares Full Popular"),
    (16, "FORMACION LABORAL", "Total Auxiliares"),
    (17, "FORMACION LABORAL", "Técnico Laboral Regular - Presencial"),
    (18, "FORMACION LABORAL", "Técnico Laboral Regular - Virtual"),
    (19, "FORMACION LABORAL", "Técnico Laboral CampeSENA"),
    (20, "FORMACION LABORAL", "Técnico Laboral Full Popular"),
    (21, "FORMACION LABORAL", "Técnico Laboral Articulación con la Media"),
    (22, "FORMACION LABORAL", "Total Técnico Laboral"),
    (23, "FORMACION LABORAL", "Total Profundización Técnica"),
    (24, "FORMACION LABORAL", "TOTAL FORMACIÓN LABORAL"),
    (25, "FORMACION TITULADA", "TOTAL FORMACION TITULADA"),
    (26, "FORMACION COMPLEMENTARIA", "Formación Complementaria - Virtual (Sin Bilingüismo)"),
    (27, "FORMACION COMPLEMENTARIA", "Formación Complementaria - Presencial (Sin Bilingüismo)"),
    (28, "PROGRAMA DE BILINGUISMO", "Programa de Bilingüismo - Virtual"),
    (29, "PROGRAMA DE BILINGUISMO", "Programa de Bilingüismo - Presencial"),
    (30, "PROGRAMA DE BILINGUISMO", "Total Programa de Bilingüismo"),
    (31, "FORMACION COMPLEMENTARIA", "Formación Complementaria CampeSENA"),
    (32, "FORMACION COMPLEMENTARIA", "Formación Complementaria Full Popular"),
    (33, "FORMACION COMPLEMENTARIA", "TOTAL FORMACION COMPLEMENTARIA"),
    (34, "FORMACION PROFESIONAL INTEGRAL", "TOTAL FORMACION PROFESIONAL INTEGRAL"),
    (35, "PROGRAMAS RELEVANTES", "Total Formación Profesional CampeSENA"),
    (36, "PROGRAMAS RELEVANTES", "Total Formación Profesional Full Popular"),
    (37, "PROGRAMAS RELEVANTES", "Total Formación Profesional Integral - Virtual"),
];

/// Retention columns: (column, formation type, modality).
pub const RETENTION_COLUMNS: &[(usize, &str, Option<&str>)] = &[
    (38, "FORMACION LABORAL", Some("Presencial")),
    (39, "FORMACION LABORAL", Some("Virtual")),
    (40, "FORMACION LABORAL", Some("TOTAL")),
    (41, "EDUCACION SUPERIOR", Some("Presencial")),
    (42, "EDUCACION SUPERIOR", Some("Virtual")),
    (43, "EDUCACION SUPERIOR", Some("TOTAL")),
    (44, "FORMACION TITULADA", Some("Presencial")),
    (45, "FORMACION TITULADA", Some("Virtual")),
    (46, "FORMACION TITULADA", Some("TOTAL")),
    (47, "COMPLEMENTARIA", Some("Presencial")),
    (48, "COMPLEMENTARIA", Some("Virtual")),
    (49, "COMPLEMENTARIA", Some("TOTAL")),
    (50, "FORMACION PROFESIONAL", Some("Presencial")),
    (51, "FORMACION PROFESIONAL", Some("Virtual")),
    (52, "FORMACION PROFESIONAL", Some("TOTAL")),
    (53, "PROGRAMA DE BILINGUISMO", Some("Presencial")),
    (54, "PROGRAMA DE BILINGUISMO", Some("Virtual")),
    (55, "PROGRAMA DE BILINGUISMO", Some("TOTAL")),
    (56, "CampeSENA", None),
    (57, "Full Popular", None),
];

/// Certification columns: (column, formation type).
pub const CERTIFICATION_COLUMNS: &[(usize, &str)] = &[
    (58, "FORMACION LABORAL"),
    (59, "EDUCACION SUPERIOR"),
    (60, "FORMACION TITULADA"),
    (61, "FORMACION COMPLEMENTARIA"),
    (62, "FORMACION PROFESIONAL INTEGRAL"),
    (63, "ARTICULACION CON LA MEDIA"),
    (64, "CampeSENA"),
    (65, "Full Popular"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaGoal {
    pub region: i64,
    pub category: String,
    pub subcategory: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionGoal {
    pub region: i64,
    pub formation: String,
    pub modality: Option<String>,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CertificationGoal {
    pub region: i64,
    pub formation: String,
    pub value: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GoalSet {
    pub regions: Vec<(i64, String)>,
    pub quotas: Vec<QuotaGoal>,
    pub retention: Vec<RetentionGoal>,
    pub certification: Vec<CertificationGoal>,
    /// Rows whose code is not an integer (subtotal and total rows).
    pub skipped_rows: usize,
    /// Non-empty goal cells that are not numbers.
    pub skipped_values: usize,
}

fn goal_value(cell: &Cell, skipped: &mut usize) -> Option<i64> {
    if cell.is_empty() {
        return None;
    }
    let v = to_measure(cell);
    if v.is_none() {
        *skipped += 1;
    }
    v
}

pub fn extract_goals(grid: &Grid) -> Result<GoalSet, EngineError> {
    if grid.height() == 0 {
        return Err(EngineError::EmptyGrid {
            sheet: grid.name.clone(),
        });
    }

    let mut set = GoalSet::default();
    for row in GOALS_FIRST_ROW..grid.height() {
        let code_cell = grid.cell(row, CODE_COL);
        if code_cell.is_empty() {
            continue;
        }
        let Some(region) = to_code(code_cell) else {
            set.skipped_rows += 1;
            continue;
        };
        let Some(name) = to_text(grid.cell(row, NAME_COL)) else {
            set.skipped_rows += 1;
            continue;
        };
        set.regions.push((region, name));

        for &(col, category, subcategory) in QUOTA_COLUMNS {
            if let Some(value) = goal_value(grid.cell(row, col), &mut set.skipped_values) {
                set.quotas.push(QuotaGoal {
                    region,
                    category: category.into(),
                    subcategory: subcategory.into(),
                    value,
                });
            }
        }
        for &(col, formation, modality) in RETENTION_COLUMNS {
            if let Some(value) = goal_value(grid.cell(row, col), &mut set.skipped_values) {
                set.retention.push(RetentionGoal {
                    region,
                    formation: formation.into(),
                    modality: modality.map(String::from),
                    value,
                });
            }
        }
        for &(col, formation) in CERTIFICATION_COLUMNS {
            if let Some(value) = goal_value(grid.cell(row, col), &mut set.skipped_values) {
                set.certification.push(CertificationGoal {
                    region,
                    formation: formation.into(),
                    value,
                });
            }
        }
    }

    tracing::info!(
        regions = set.regions.len(),
        quotas = set.quotas.len(),
        retention = set.retention.len(),
        certification = set.certification.len(),
        skipped_rows = set.skipped_rows,
        "goals extracted"
    );
    Ok(set)
}

pub fn goal_schemas() -> Vec<TableSchema> {
    vec![
        TableSchema::new(REGIONS_TABLE, MergePolicy::ReplaceLast)
            .column("codigo_regional", SqlType::Integer)
            .column("nombre_regional", SqlType::Text)
            .key(&["codigo_regional"]),
        TableSchema::new(CATEGORIES_TABLE, MergePolicy::KeepFirst)
            .column("categoria_principal", SqlType::Text)
            .column("subcategoria", SqlType::Text)
            .column("tipo_medida", SqlType::Text)
            .key(&["categoria_principal", "subcategoria"]),
        TableSchema::new(QUOTAS_TABLE, MergePolicy::ReplaceLast)
            .column("codigo_regional", SqlType::Integer)
            .column("categoria_principal", SqlType::Text)
            .column("subcategoria", SqlType::Text)
            .column("anio", SqlType::Integer)
            .column("valor", SqlType::Integer)
            .key(&["codigo_regional", "categoria_principal", "subcategoria", "anio"]),
        TableSchema::new(RETENTION_TABLE, MergePolicy::ReplaceLast)
            .column("codigo_regional", SqlType::Integer)
            .column("tipo_formacion", SqlType::Text)
            .column("modalidad", SqlType::Text)
            .column("anio", SqlType::Integer)
            .column("valor", SqlType::Integer)
            .key(&["codigo_regional", "tipo_formacion", "modalidad", "anio"]),
        TableSchema::new(CERTIFICATION_TABLE, MergePolicy::ReplaceLast)
            .column("codigo_regional", SqlType::Integer)
            .column("tipo_formacion", SqlType::Text)
            .column("anio", SqlType::Integer)
            .column("valor", SqlType::Integer)
            .key(&["codigo_regional", "tipo_formacion", "anio"]),
    ]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GoalsSummary {
    pub year: i32,
    pub regions: usize,
    pub categories: usize,
    pub quotas: usize,
    pub retention: usize,
    pub certification: usize,
    pub skipped_rows: usize,
    pub skipped_values: usize,
}

/// Create the goal tables if needed and register their schemas with `sink`,
/// so a database written by an earlier run can be read back.
pub fn declare_goal_tables(sink: &mut dyn RelationalSink) -> Result<(), EngineError> {
    for schema in goal_schemas() {
        sink.create_table(&schema)?;
    }
    Ok(())
}

/// Write `goals` for `year`. Re-running with the same input leaves the
/// tables unchanged.
pub fn persist_goals(
    goals: &GoalSet,
    sink: &mut dyn RelationalSink,
    year: i32,
) -> Result<GoalsSummary, EngineError> {
    declare_goal_tables(sink)?;
    let year_v = Value::Integer(i64::from(year));

    for (code, name) in &goals.regions {
        sink.upsert(REGIONS_TABLE, &[Value::Integer(*code), name.as_str().into()])?;
    }
    for &(_, category, subcategory) in QUOTA_COLUMNS {
        sink.upsert(CATEGORIES_TABLE, &[Value::from(category), subcategory.into(), "Cupos".into()])?;
    }
    for q in &goals.quotas {
        sink.upsert(
            QUOTAS_TABLE,
            &[
                Value::Integer(q.region),
                q.category.as_str().into(),
                q.subcategory.as_str().into(),
                year_v.clone(),
                Value::Integer(q.value),
            ],
        )?;
    }
    for r in &goals.retention {
        // a missing modality is stored as '' so it can take part in the key
        sink.upsert(
            RETENTION_TABLE,
            &[
                Value::Integer(r.region),
                r.formation.as_str().into(),
                r.modality.as_deref().unwrap_or("").into(),
                year_v.clone(),
                Value::Integer(r.value),
            ],
        )?;
    }
    for c in &goals.certification {
        sink.upsert(
            CERTIFICATION_TABLE,
            &[
                Value::Integer(c.region),
                c.formation.as_str().into(),
                year_v.clone(),
                Value::Integer(c.value),
            ],
        )?;
    }
    sink.commit()?;

    Ok(GoalsSummary {
        year,
        regions: sink.count(REGIONS_TABLE)?,
        categories: sink.count(CATEGORIES_TABLE)?,
        quotas: sink.count(QUOTAS_TABLE)?,
        retention: sink.count(RETENTION_TABLE)?,
        certification: sink.count(CERTIFICATION_TABLE)?,
        skipped_rows: goals.skipped_rows,
        skipped_values: goals.skipped_values,
    })
}

/// Regional names as stored, ordered by code.
pub fn read_regions(sink: &dyn RelationalSink) -> Result<Vec<(i64, String)>, EngineError> {
    Ok(sink
        .scan(REGIONS_TABLE)?
        .into_iter()
        .filter_map(|r| Some((r.first()?.as_i64()?, r.get(1)?.to_string())))
        .collect())
}

/// Quota goals for `year`.
pub fn read_quotas(sink: &dyn RelationalSink, year: i32) -> Result<Vec<QuotaGoal>, EngineError> {
    let year = i64::from(year);
    Ok(sink
        .scan(QUOTAS_TABLE)?
        .into_iter()
        .filter(|r| r.get(3).and_then(Value::as_i64) == Some(year))
        .filter_map(|r| {
            Some(QuotaGoal {
                region: r.first()?.as_i64()?,
                category: r.get(1)?.to_string(),
                subcategory: r.get(2)?.to_string(),
                value: r.get(4)?.as_i64()?,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn goals_grid() -> Grid {
        let mut rows = vec![vec![Cell::Empty; 66]; 3];
        let mut antioquia = vec![Cell::Empty; 66];
        antioquia[0] = Cell::Number(5.0);
        antioquia[1] = Cell::Text("ANTIOQUIA".into());
        antioquia[21] = Cell::Number(1200.0);
        antioquia[25] = Cell::Number(50000.0);
        antioquia[26] = Cell::Text("n/d".into());
        antioquia[56] = Cell::Number(90.0);
        antioquia[63] = Cell::Number(400.0);
        rows.push(antioquia);
        let mut total = vec![Cell::Empty; 66];
        total[0] = Cell::Text("TOTAL".into());
        total[25] = Cell::Number(99999.0);
        rows.push(total);
        Grid::new(GOALS_SHEET, rows)
    }

    #[test]
    fn extracts_fixed_columns_and_skips_totals() {
        let set = extract_goals(&goals_grid()).unwrap();
        assert_eq!(set.regions, vec![(5, "ANTIOQUIA".to_string())]);
        assert_eq!(set.quotas.len(), 2);
        assert_eq!(set.quotas[0].subcategory, "Técnico Laboral Articulación con la Media");
        assert_eq!(set.retention[0].modality, None);
        assert_eq!(set.certification[0].formation, "ARTICULACION CON LA MEDIA");
        assert_eq!(set.skipped_rows, 1);
        assert_eq!(set.skipped_values, 1);
    }

    #[test]
    fn persisting_twice_is_idempotent() {
        let set = extract_goals(&goals_grid()).unwrap();
        let mut sink = MemorySink::new();
        persist_goals(&set, &mut sink, 2025).unwrap();
        let again = persist_goals(&set, &mut sink, 2025).unwrap();
        assert_eq!(again.quotas, 2);
        assert_eq!(again.retention, 1);
        assert_eq!(again.categories, QUOTA_COLUMNS.len());

        let quotas = read_quotas(&sink, 2025).unwrap();
        assert_eq!(quotas.len(), 2);
        assert!(read_quotas(&sink, 2024).unwrap().is_empty());
        assert_eq!(read_regions(&sink).unwrap(), vec![(5, "ANTIOQUIA".to_string())]);
    }

    #[test]
    fn empty_sheet_is_structural() {
        let err = extract_goals(&Grid::new(GOALS_SHEET, vec![])).unwrap_err();
        assert!(err.is_structural());
    }
}
