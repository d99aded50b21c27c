//! Entity normalization and fact loading.
//!
//! An [`ImportPlan`] describes how one wide sheet splits into entity tables
//! (natural key + display fields, first write wins) and an optional fact
//! table (source record id + attributes + foreign codes, last write wins).
//! [`load_grid`] runs the plan against a [`RelationalSink`] in commit windows.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::coerce::{coerce, ColumnKind};
use crate::columns::{ColumnMap, FieldSpec, FieldWarning};
use crate::error::EngineError;
use crate::grid::Grid;
use crate::header::{HeaderRow, HeaderRule};
use crate::sink::{MergePolicy, RelationalSink, SqlType, TableSchema, Upsert};
use crate::value::Value;

pub const DEFAULT_COMMIT_EVERY: usize = 5000;

/// One table column fed from one resolved field.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub column: String,
    pub field: String,
    pub kind: ColumnKind,
}

impl Binding {
    pub fn new(column: &str, field: &str, kind: ColumnKind) -> Self {
        Self {
            column: column.to_string(),
            field: field.to_string(),
            kind,
        }
    }
}

fn sql_type(kind: ColumnKind) -> SqlType {
    match kind {
        ColumnKind::Code | ColumnKind::Measure => SqlType::Integer,
        ColumnKind::RealCode | ColumnKind::RealMeasure => SqlType::Real,
        ColumnKind::Text => SqlType::Text,
        ColumnKind::Timestamp => SqlType::Timestamp,
    }
}

/// A table fed from a sheet: schema derived from its bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMapping {
    pub schema: TableSchema,
    pub bindings: Vec<Binding>,
    /// Columns (beyond the key) that must be non-null for the row to load.
    pub required: Vec<String>,
}

impl TableMapping {
    fn build(table: &str, key: &[&str], bindings: Vec<Binding>, policy: MergePolicy) -> Self {
        let mut schema = TableSchema::new(table, policy).key(key);
        for b in &bindings {
            schema = schema.column(&b.column, sql_type(b.kind));
        }
        Self {
            schema,
            bindings,
            required: Vec::new(),
        }
    }

    /// Insert-if-absent table (`KeepFirst`).
    pub fn entity(table: &str, key: &[&str], bindings: Vec<Binding>) -> Self {
        Self::build(table, key, bindings, MergePolicy::KeepFirst)
    }

    /// Insert-or-replace table (`ReplaceLast`).
    pub fn fact(table: &str, key: &[&str], bindings: Vec<Binding>) -> Self {
        Self::build(table, key, bindings, MergePolicy::ReplaceLast)
    }

    pub fn require(mut self, columns: &[&str]) -> Self {
        self.required = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportPlan {
    pub name: String,
    pub header: HeaderRule,
    pub fields: Vec<FieldSpec>,
    pub entities: Vec<TableMapping>,
    pub fact: Option<TableMapping>,
}

impl ImportPlan {
    /// Every binding must name a declared field and every table must have a
    /// usable key.
    pub fn validate(&self) -> Result<(), EngineError> {
        for mapping in self.tables() {
            mapping.schema.validate()?;
            for b in &mapping.bindings {
                if !self.fields.iter().any(|f| f.name == b.field) {
                    return Err(EngineError::Schema(format!(
                        "plan '{}': table '{}' binds undeclared field '{}'",
                        self.name,
                        mapping.name(),
                        b.field
                    )));
                }
            }
            for r in &mapping.required {
                if mapping.schema.column_index(r).is_none() {
                    return Err(EngineError::Schema(format!(
                        "plan '{}': table '{}' requires unknown column '{r}'",
                        self.name,
                        mapping.name()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableMapping> {
        self.entities.iter().chain(self.fact.iter())
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables().map(|t| t.name().to_string()).collect()
    }

    pub fn create_tables(&self, sink: &mut dyn RelationalSink) -> Result<(), EngineError> {
        for mapping in self.tables() {
            sink.create_table(&mapping.schema)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub commit_every: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            commit_every: DEFAULT_COMMIT_EVERY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub plan: String,
    pub sheet: String,
    pub header_row: usize,
    /// Non-blank rows after the header.
    pub data_rows: usize,
    pub facts_written: usize,
    /// Rows whose fact key was null.
    pub rows_skipped: usize,
    /// Rows abandoned because the sink rejected a write.
    pub row_errors: usize,
    /// Non-empty cells that could not be read as their column kind.
    pub coercion_defaults: usize,
    pub entity_writes: BTreeMap<String, usize>,
    pub warnings: Vec<FieldWarning>,
    pub commits: usize,
}

/// Run `plan` over `grid`, writing to `sink`. Structural problems (empty
/// grid, no header) abort; per-row sink failures are logged and counted.
pub fn load_grid(
    grid: &Grid,
    plan: &ImportPlan,
    sink: &mut dyn RelationalSink,
    opts: LoadOptions,
) -> Result<ImportSummary, EngineError> {
    plan.validate()?;
    if grid.height() == 0 {
        return Err(EngineError::EmptyGrid {
            sheet: grid.name.clone(),
        });
    }

    let header_idx = plan.header.locate(grid)?;
    let header = HeaderRow::from_grid(grid, header_idx);
    let columns = ColumnMap::resolve(&grid.name, &header, &plan.fields);
    plan.create_tables(sink)?;

    let mut summary = ImportSummary {
        plan: plan.name.clone(),
        sheet: grid.name.clone(),
        header_row: header_idx,
        warnings: columns.warnings().to_vec(),
        ..Default::default()
    };
    for t in &plan.entities {
        summary.entity_writes.insert(t.name().to_string(), 0);
    }

    let commit_every = opts.commit_every.max(1);
    tracing::info!(
        plan = %plan.name,
        sheet = %grid.name,
        header_row = header_idx,
        rows = grid.height() - header.data_start(),
        "loading sheet"
    );

    for row in header.data_start()..grid.height() {
        if grid.row(row).iter().all(|c| c.is_empty()) {
            continue;
        }
        summary.data_rows += 1;

        let mut cache: HashMap<(String, ColumnKind), Value> = HashMap::new();
        let mut values_for = |mapping: &TableMapping, defaults: &mut usize| -> Vec<Value> {
            mapping
                .bindings
                .iter()
                .map(|b| {
                    cache
                        .entry((b.field.clone(), b.kind))
                        .or_insert_with(|| {
                            let c = coerce(columns.cell(grid, row, &b.field), b.kind);
                            if c.defaulted {
                                *defaults += 1;
                            }
                            c.value
                        })
                        .clone()
                })
                .collect()
        };

        let mut defaults = 0;
        let mut pending: Vec<(&TableMapping, Vec<Value>)> = Vec::new();
        for mapping in &plan.entities {
            pending.push((mapping, values_for(mapping, &mut defaults)));
        }
        let fact = plan.fact.as_ref().map(|m| (m, values_for(m, &mut defaults)));
        summary.coercion_defaults += defaults;

        match write_row(sink, pending, fact, &mut summary) {
            Ok(()) => {}
            Err(e) => {
                summary.row_errors += 1;
                tracing::warn!(sheet = %grid.name, row = row + 1, "row skipped: {e}");
            }
        }

        if summary.data_rows % commit_every == 0 {
            sink.commit()?;
            summary.commits += 1;
            tracing::debug!(rows = summary.data_rows, "commit");
        }
    }

    sink.commit()?;
    summary.commits += 1;
    tracing::info!(
        plan = %plan.name,
        data_rows = summary.data_rows,
        facts = summary.facts_written,
        skipped = summary.rows_skipped,
        errors = summary.row_errors,
        "sheet loaded"
    );
    Ok(summary)
}

fn loadable(mapping: &TableMapping, row: &[Value]) -> bool {
    let key_ok = mapping
        .schema
        .key_indices()
        .map(|idx| idx.iter().all(|&i| !row[i].is_null()))
        .unwrap_or(false);
    key_ok
        && mapping
            .required
            .iter()
            .filter_map(|c| mapping.schema.column_index(c))
            .all(|i| !row[i].is_null())
}

fn write_row(
    sink: &mut dyn RelationalSink,
    entities: Vec<(&TableMapping, Vec<Value>)>,
    fact: Option<(&TableMapping, Vec<Value>)>,
    summary: &mut ImportSummary,
) -> Result<(), EngineError> {
    for (mapping, row) in entities {
        if !loadable(mapping, &row) {
            continue;
        }
        if sink.upsert(mapping.name(), &row)? == Upsert::Written {
            *summary.entity_writes.entry(mapping.name().to_string()).or_default() += 1;
        }
    }
    if let Some((mapping, row)) = fact {
        if !loadable(mapping, &row) {
            summary.rows_skipped += 1;
            return Ok(());
        }
        sink.upsert(mapping.name(), &row)?;
        summary.facts_written += 1;
    }
    Ok(())
}

/// Row counts per table, for post-import statistics.
pub fn table_counts(
    sink: &dyn RelationalSink,
    tables: &[String],
) -> Result<Vec<(String, usize)>, EngineError> {
    tables
        .iter()
        .map(|t| Ok((t.clone(), sink.count(t)?)))
        .collect()
}
