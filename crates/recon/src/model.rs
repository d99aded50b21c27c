use std::collections::BTreeMap;

use metagrid_engine::GeoCode;
use serde::Serialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Metric sources
// ---------------------------------------------------------------------------

/// Rows keyed by a code, each carrying one integer per named metric.
/// Keeps arrival order; the first row for a key wins.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable<K: Ord + Clone> {
    pub name: String,
    pub metrics: Vec<String>,
    rows: Vec<(K, Vec<i64>)>,
    index: BTreeMap<K, usize>,
    /// Rows dropped because their key had already been seen.
    pub duplicates: usize,
}

impl<K: Ord + Clone> MetricTable<K> {
    pub fn new<S: Into<String>>(name: &str, metrics: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.to_string(),
            metrics: metrics.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            index: BTreeMap::new(),
            duplicates: 0,
        }
    }

    /// Returns `false` (and counts a duplicate) if `key` is already present.
    /// Missing trailing values are zero.
    pub fn insert(&mut self, key: K, mut values: Vec<i64>) -> bool {
        if self.index.contains_key(&key) {
            self.duplicates += 1;
            return false;
        }
        values.resize(self.metrics.len(), 0);
        self.index.insert(key.clone(), self.rows.len());
        self.rows.push((key, values));
        true
    }

    pub fn metric_index(&self, metric: &str) -> Option<usize> {
        self.metrics.iter().position(|m| m == metric)
    }

    pub fn has_metric(&self, metric: &str) -> bool {
        self.metric_index(metric).is_some()
    }

    pub fn require_metric(&self, metric: &str) -> Result<usize, ReconError> {
        self.metric_index(metric).ok_or_else(|| ReconError::UnknownColumn {
            table: self.name.clone(),
            column: metric.to_string(),
        })
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn value(&self, key: &K, metric: usize) -> Option<i64> {
        let row = *self.index.get(key)?;
        self.rows[row].1.get(metric).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.rows.iter().map(|(k, _)| k)
    }

    pub fn rows(&self) -> &[(K, Vec<i64>)] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// A key with its display names, as seen in one source row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogRecord<K> {
    pub key: K,
    pub names: Vec<Option<String>>,
}

impl<K> CatalogRecord<K> {
    pub fn new(key: K, names: Vec<Option<String>>) -> Self {
        Self { key, names }
    }

    pub fn name(&self, i: usize) -> Option<&str> {
        self.names.get(i).and_then(|n| n.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Reconciliation output
// ---------------------------------------------------------------------------

/// target − achieved for one output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeltaPair {
    pub target: String,
    pub achieved: String,
    pub output: String,
}

impl DeltaPair {
    pub fn new(target: &str, achieved: &str, output: &str) -> Self {
        Self {
            target: target.into(),
            achieved: achieved.into(),
            output: output.into(),
        }
    }
}

/// Values are aligned with the reconciliation's pairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledRow<K> {
    pub key: K,
    pub target: Vec<i64>,
    pub achieved: Vec<i64>,
    /// Never clamped; negative means the target was exceeded.
    pub remaining: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation<K> {
    pub pairs: Vec<DeltaPair>,
    pub rows: Vec<ReconciledRow<K>>,
    /// Keys seen in achieved sources but absent from the base.
    pub excluded_keys: usize,
}

impl<K> Reconciliation<K> {
    /// Column-wise sums of `remaining`.
    pub fn totals(&self) -> Vec<i64> {
        let mut totals = vec![0i64; self.pairs.len()];
        for row in &self.rows {
            for (t, v) in totals.iter_mut().zip(&row.remaining) {
                *t += v;
            }
        }
        totals
    }
}

// ---------------------------------------------------------------------------
// Rollups
// ---------------------------------------------------------------------------

/// Sentinel child code carried by aggregate rows.
pub const AGGREGATE_CHILD: i64 = 0;

/// One output line of a parent/child hierarchy, either a detail row or a
/// synthetic per-parent aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupRow {
    pub parent_code: i64,
    pub child_code: i64,
    pub parent_name: Option<String>,
    pub child_name: Option<String>,
    pub geo: GeoCode,
    pub metrics: Vec<i64>,
    pub is_aggregate: bool,
}
