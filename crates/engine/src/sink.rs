//! Relational sink abstraction: declared schemas, keyed upserts with a
//! per-table merge policy, and explicit commit windows.

use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::value::{RowKey, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Real,
    Text,
    Timestamp,
}

impl SqlType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
            SqlType::Timestamp => "TIMESTAMP",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: SqlType,
}

/// What happens when a row arrives whose key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Insert if absent; later rows with the same key are ignored.
    KeepFirst,
    /// Insert or replace; the last row for a key wins.
    ReplaceLast,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
    pub policy: MergePolicy,
}

impl TableSchema {
    pub fn new(name: &str, policy: MergePolicy) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            policy,
        }
    }

    pub fn column(mut self, name: &str, sql_type: SqlType) -> Self {
        self.columns.push(ColumnDef {
            name: name.to_string(),
            sql_type,
        });
        self
    }

    pub fn key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Positions of the primary-key columns within a row.
    pub fn key_indices(&self) -> Result<Vec<usize>, EngineError> {
        self.primary_key
            .iter()
            .map(|k| {
                self.column_index(k).ok_or_else(|| {
                    EngineError::Schema(format!("table '{}': key column '{k}' not declared", self.name))
                })
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.primary_key.is_empty() {
            return Err(EngineError::Schema(format!("table '{}' declares no primary key", self.name)));
        }
        for (i, col) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == col.name) {
                return Err(EngineError::Schema(format!(
                    "table '{}': duplicate column '{}'",
                    self.name, col.name
                )));
            }
        }
        self.key_indices().map(|_| ())
    }

    /// Key tuple of `row`; a null part is a schema violation.
    pub fn key_of(&self, row: &[Value]) -> Result<Vec<Value>, EngineError> {
        if row.len() != self.columns.len() {
            return Err(EngineError::Schema(format!(
                "table '{}': expected {} values, got {}",
                self.name,
                self.columns.len(),
                row.len()
            )));
        }
        let mut key = Vec::with_capacity(self.primary_key.len());
        for i in self.key_indices()? {
            if row[i].is_null() {
                return Err(EngineError::Schema(format!(
                    "table '{}': null in key column '{}'",
                    self.name, self.columns[i].name
                )));
            }
            key.push(row[i].clone());
        }
        Ok(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Written,
    /// Key already present under `KeepFirst`.
    Ignored,
}

/// Anything that can persist keyed rows.
pub trait RelationalSink {
    /// Idempotent; creating an existing table is a no-op.
    fn create_table(&mut self, schema: &TableSchema) -> Result<(), EngineError>;

    /// Insert `row` (values in schema column order) under the table's policy.
    fn upsert(&mut self, table: &str, row: &[Value]) -> Result<Upsert, EngineError>;

    fn get(&self, table: &str, key: &[Value]) -> Result<Option<Vec<Value>>, EngineError>;

    /// All rows, ordered by primary key.
    fn scan(&self, table: &str) -> Result<Vec<Vec<Value>>, EngineError>;

    fn count(&self, table: &str) -> Result<usize, EngineError>;

    fn commit(&mut self) -> Result<(), EngineError>;
}

// ---------------------------------------------------------------------------
// In-memory sink
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct MemTable {
    schema: TableSchema,
    rows: BTreeMap<RowKey, Vec<Value>>,
}

/// `BTreeMap`-backed sink. Commits are counted but have no other effect.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    tables: BTreeMap<String, MemTable>,
    commits: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn schema(&self, table: &str) -> Option<&TableSchema> {
        self.tables.get(table).map(|t| &t.schema)
    }

    fn table(&self, name: &str) -> Result<&MemTable, EngineError> {
        self.tables
            .get(name)
            .ok_or_else(|| EngineError::UnknownTable(name.to_string()))
    }
}

impl RelationalSink for MemorySink {
    fn create_table(&mut self, schema: &TableSchema) -> Result<(), EngineError> {
        schema.validate()?;
        self.tables.entry(schema.name.clone()).or_insert_with(|| MemTable {
            schema: schema.clone(),
            rows: BTreeMap::new(),
        });
        Ok(())
    }

    fn upsert(&mut self, table: &str, row: &[Value]) -> Result<Upsert, EngineError> {
        let t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| EngineError::UnknownTable(table.to_string()))?;
        let key = RowKey(t.schema.key_of(row)?);
        match t.schema.policy {
            MergePolicy::KeepFirst if t.rows.contains_key(&key) => Ok(Upsert::Ignored),
            _ => {
                t.rows.insert(key, row.to_vec());
                Ok(Upsert::Written)
            }
        }
    }

    fn get(&self, table: &str, key: &[Value]) -> Result<Option<Vec<Value>>, EngineError> {
        let t = self.table(table)?;
        Ok(t.rows.get(&RowKey(key.to_vec())).cloned())
    }

    fn scan(&self, table: &str) -> Result<Vec<Vec<Value>>, EngineError> {
        Ok(self.table(table)?.rows.values().cloned().collect())
    }

    fn count(&self, table: &str) -> Result<usize, EngineError> {
        Ok(self.table(table)?.rows.len())
    }

    fn commit(&mut self) -> Result<(), EngineError> {
        self.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions(policy: MergePolicy) -> TableSchema {
        TableSchema::new("regionales", policy)
            .column("codigo", SqlType::Integer)
            .column("nombre", SqlType::Text)
            .key(&["codigo"])
    }

    #[test]
    fn keep_first_ignores_later_rows() {
        let mut sink = MemorySink::new();
        sink.create_table(&regions(MergePolicy::KeepFirst)).unwrap();
        assert_eq!(sink.upsert("regionales", &[Value::Integer(5), "Antioquia".into()]).unwrap(), Upsert::Written);
        assert_eq!(sink.upsert("regionales", &[Value::Integer(5), "Otra".into()]).unwrap(), Upsert::Ignored);
        let row = sink.get("regionales", &[Value::Integer(5)]).unwrap().unwrap();
        assert_eq!(row[1], Value::from("Antioquia"));
    }

    #[test]
    fn replace_last_overwrites() {
        let mut sink = MemorySink::new();
        sink.create_table(&regions(MergePolicy::ReplaceLast)).unwrap();
        sink.upsert("regionales", &[Value::Integer(5), "A".into()]).unwrap();
        sink.upsert("regionales", &[Value::Integer(5), "B".into()]).unwrap();
        assert_eq!(sink.count("regionales").unwrap(), 1);
        assert_eq!(sink.scan("regionales").unwrap()[0][1], Value::from("B"));
    }

    #[test]
    fn null_key_and_arity_are_rejected() {
        let mut sink = MemorySink::new();
        sink.create_table(&regions(MergePolicy::KeepFirst)).unwrap();
        assert!(matches!(
            sink.upsert("regionales", &[Value::Null, "A".into()]),
            Err(EngineError::Schema(_))
        ));
        assert!(matches!(
            sink.upsert("regionales", &[Value::Integer(1)]),
            Err(EngineError::Schema(_))
        ));
        assert!(matches!(sink.count("nope"), Err(EngineError::UnknownTable(_))));
    }

    #[test]
    fn schema_without_key_is_invalid() {
        let s = TableSchema::new("t", MergePolicy::KeepFirst).column("a", SqlType::Text);
        assert!(s.validate().is_err());
        let s = s.key(&["b"]);
        assert!(s.validate().is_err());
    }
}
