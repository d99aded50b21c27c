// Relational sink backed by SQLite

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};

use metagrid_engine::sink::Upsert;
use metagrid_engine::{EngineError, MergePolicy, RelationalSink, TableSchema, Value};

/// Writes go through one open transaction per commit window; the first
/// upsert after a commit begins it.
pub struct SqliteSink {
    conn: Connection,
    schemas: BTreeMap<String, TableSchema>,
    in_transaction: bool,
    commits: usize,
}

fn sink_err(e: rusqlite::Error) -> EngineError {
    EngineError::Sink(e.to_string())
}

impl SqliteSink {
    pub fn open(path: &Path) -> Result<Self, EngineError> {
        let conn = Connection::open(path)
            .map_err(|e| EngineError::Sink(format!("cannot open '{}': {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "sqlite sink opened");
        Ok(Self::with_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, EngineError> {
        Ok(Self::with_connection(Connection::open_in_memory().map_err(sink_err)?))
    }

    fn with_connection(conn: Connection) -> Self {
        Self {
            conn,
            schemas: BTreeMap::new(),
            in_transaction: false,
            commits: 0,
        }
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    fn schema(&self, table: &str) -> Result<&TableSchema, EngineError> {
        self.schemas
            .get(table)
            .ok_or_else(|| EngineError::UnknownTable(table.to_string()))
    }

    fn begin(&mut self) -> Result<(), EngineError> {
        if !self.in_transaction {
            self.conn.execute_batch("BEGIN").map_err(sink_err)?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

pub fn create_table_sql(schema: &TableSchema) -> String {
    let mut defs: Vec<String> = schema
        .columns
        .iter()
        .map(|c| format!("\"{}\" {}", c.name, c.sql_type.as_sql()))
        .collect();
    let key: Vec<String> = schema.primary_key.iter().map(|k| format!("\"{k}\"")).collect();
    defs.push(format!("PRIMARY KEY ({})", key.join(", ")));
    format!("CREATE TABLE IF NOT EXISTS \"{}\" ({})", schema.name, defs.join(", "))
}

fn upsert_sql(schema: &TableSchema) -> String {
    let verb = match schema.policy {
        MergePolicy::KeepFirst => "INSERT OR IGNORE",
        MergePolicy::ReplaceLast => "INSERT OR REPLACE",
    };
    let cols: Vec<String> = schema.columns.iter().map(|c| format!("\"{}\"", c.name)).collect();
    let params: Vec<String> = (1..=cols.len()).map(|i| format!("?{i}")).collect();
    format!(
        "{verb} INTO \"{}\" ({}) VALUES ({})",
        schema.name,
        cols.join(", "),
        params.join(", ")
    )
}

fn key_clause(schema: &TableSchema) -> String {
    schema
        .primary_key
        .iter()
        .map(|k| format!("\"{k}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_sql_value(v: &Value) -> SqlValue {
    match v {
        Value::Null => SqlValue::Null,
        Value::Integer(n) => SqlValue::Integer(*n),
        Value::Real(n) => SqlValue::Real(*n),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn from_sql_ref(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Integer(n),
        ValueRef::Real(n) => Value::Real(n),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Text(String::from_utf8_lossy(b).into_owned()),
    }
}

impl SqliteSink {
    fn query_rows(
        &self,
        sql: &str,
        width: usize,
        params: Vec<SqlValue>,
    ) -> Result<Vec<Vec<Value>>, EngineError> {
        let mut stmt = self.conn.prepare_cached(sql).map_err(sink_err)?;
        let mut rows = stmt.query(params_from_iter(params)).map_err(sink_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(sink_err)? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(from_sql_ref(row.get_ref(i).map_err(sink_err)?));
            }
            out.push(values);
        }
        Ok(out)
    }
}

impl RelationalSink for SqliteSink {
    fn create_table(&mut self, schema: &TableSchema) -> Result<(), EngineError> {
        schema.validate()?;
        self.conn
            .execute_batch(&create_table_sql(schema))
            .map_err(sink_err)?;
        self.schemas.insert(schema.name.clone(), schema.clone());
        Ok(())
    }

    fn upsert(&mut self, table: &str, row: &[Value]) -> Result<Upsert, EngineError> {
        let sql = {
            let schema = self.schema(table)?;
            schema.key_of(row)?;
            upsert_sql(schema)
        };
        self.begin()?;
        let mut stmt = self.conn.prepare_cached(&sql).map_err(sink_err)?;
        let changed = stmt
            .execute(params_from_iter(row.iter().map(to_sql_value)))
            .map_err(sink_err)?;
        Ok(if changed > 0 { Upsert::Written } else { Upsert::Ignored })
    }

    fn get(&self, table: &str, key: &[Value]) -> Result<Option<Vec<Value>>, EngineError> {
        let schema = self.schema(table)?;
        if key.len() != schema.primary_key.len() {
            return Err(EngineError::Schema(format!(
                "table '{}': key has {} parts, expected {}",
                table,
                key.len(),
                schema.primary_key.len()
            )));
        }
        let filter: Vec<String> = schema
            .primary_key
            .iter()
            .enumerate()
            .map(|(i, k)| format!("\"{k}\" = ?{}", i + 1))
            .collect();
        let sql = format!("SELECT * FROM \"{}\" WHERE {}", table, filter.join(" AND "));
        let rows = self.query_rows(&sql, schema.columns.len(), key.iter().map(to_sql_value).collect())?;
        Ok(rows.into_iter().next())
    }

    fn scan(&self, table: &str) -> Result<Vec<Vec<Value>>, EngineError> {
        let schema = self.schema(table)?;
        let sql = format!("SELECT * FROM \"{}\" ORDER BY {}", table, key_clause(schema));
        self.query_rows(&sql, schema.columns.len(), Vec::new())
    }

    fn count(&self, table: &str) -> Result<usize, EngineError> {
        self.schema(table)?;
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |r| r.get(0))
            .map_err(sink_err)?;
        Ok(n as usize)
    }

    fn commit(&mut self) -> Result<(), EngineError> {
        if self.in_transaction {
            self.conn.execute_batch("COMMIT").map_err(sink_err)?;
            self.in_transaction = false;
        }
        self.commits += 1;
        tracing::debug!(commits = self.commits, "sqlite commit");
        Ok(())
    }
}
