use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

/// Relational scalar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Real(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Real(_) => 1,
            Value::Text(_) => 2,
        }
    }

    /// Total order: nulls, then numbers (integers and reals compared
    /// numerically), then text.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) if a.rank() == 1 && b.rank() == 1 => {
                let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                x.total_cmp(&y)
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Real(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Primary-key tuple with a total order, usable as a map key.
#[derive(Debug, Clone)]
pub struct RowKey(pub Vec<Value>);

impl PartialEq for RowKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RowKey {}

impl PartialOrd for RowKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RowKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            match a.total_cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

// ---------------------------------------------------------------------------
// Tabular output
// ---------------------------------------------------------------------------

/// Report output: ordered logical columns, rows of values, and a per-row
/// emphasis flag (rendered bold by writers that support styling).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub emphasized: Vec<bool>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            emphasized: Vec::new(),
        }
    }

    /// Rows shorter than the header are padded with nulls; longer rows are a
    /// caller bug.
    pub fn push(&mut self, mut row: Vec<Value>, emphasized: bool) {
        debug_assert!(
            row.len() <= self.columns.len(),
            "row has {} values for {} columns",
            row.len(),
            self.columns.len()
        );
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
        self.emphasized.push(emphasized);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column_values(&self, name: &str) -> Vec<&Value> {
        match self.column_index(name) {
            Some(i) => self.rows.iter().map(|r| &r[i]).collect(),
            None => Vec::new(),
        }
    }

    /// Replace logical column names with display labels; unknown names keep
    /// their logical name.
    pub fn relabel(&mut self, label: impl Fn(&str) -> Option<String>) {
        for col in &mut self.columns {
            if let Some(l) = label(col) {
                *col = l;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn integer_and_real_keys_collide() {
        let mut m = BTreeMap::new();
        m.insert(RowKey(vec![Value::Integer(5)]), "a");
        m.insert(RowKey(vec![Value::Real(5.0)]), "b");
        assert_eq!(m.len(), 1);
        assert_eq!(m[&RowKey(vec![Value::Integer(5)])], "b");
    }

    #[test]
    fn composite_keys_order_lexicographically() {
        let a = RowKey(vec![Value::Integer(1), Value::Text("b".into())]);
        let b = RowKey(vec![Value::Integer(1), Value::Text("c".into())]);
        let c = RowKey(vec![Value::Integer(2), Value::Text("a".into())]);
        assert!(a < b && b < c);
        assert!(RowKey(vec![Value::Null]) < RowKey(vec![Value::Integer(-9)]));
    }

    #[test]
    fn table_pads_short_rows() {
        let mut t = Table::new(["a", "b", "c"]);
        t.push(vec![Value::Integer(1)], true);
        assert_eq!(t.rows[0], vec![Value::Integer(1), Value::Null, Value::Null]);
        assert_eq!(t.emphasized, vec![true]);
        t.relabel(|c| (c == "a").then(|| "Código".to_string()));
        assert_eq!(t.columns[0], "Código");
        assert_eq!(t.columns[1], "b");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "row has 3 values for 2 columns")]
    fn table_rejects_rows_wider_than_header() {
        let mut t = Table::new(["a", "b"]);
        t.push(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)], false);
    }
}
