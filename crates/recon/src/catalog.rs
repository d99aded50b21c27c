//! Master catalog: one record per key across many sources, preferring the
//! record with the most complete display names.

use std::collections::BTreeMap;

use crate::model::CatalogRecord;

/// Name-coverage score: one flag per name slot, compared lexicographically.
fn score<K>(record: &CatalogRecord<K>) -> Vec<bool> {
    record
        .names
        .iter()
        .map(|n| n.as_deref().is_some_and(|s| !s.trim().is_empty()))
        .collect()
}

/// Concatenate `sources` in order and keep, for each key, the highest
/// scoring record; ties go to the earliest arrival. Output is sorted by key.
pub fn build_catalog<K: Ord + Clone>(sources: Vec<Vec<CatalogRecord<K>>>) -> Vec<CatalogRecord<K>> {
    let mut best: BTreeMap<K, (Vec<bool>, CatalogRecord<K>)> = BTreeMap::new();
    let mut seen = 0usize;

    for record in sources.into_iter().flatten() {
        seen += 1;
        let s = score(&record);
        match best.get_mut(&record.key) {
            Some((current, slot)) => {
                if s > *current {
                    *current = s;
                    *slot = record;
                }
            }
            None => {
                best.insert(record.key.clone(), (s, record));
            }
        }
    }

    tracing::debug!(records = seen, unique = best.len(), "catalog built");
    best.into_values().map(|(_, r)| r).collect()
}
