use std::collections::BTreeSet;

use crate::error::ReconError;
use crate::model::{DeltaPair, MetricTable, ReconciledRow, Reconciliation};

/// Values of `metric` from `source` for each of `keys`, in order. Keys the
/// source does not carry read as zero.
pub fn left_join_fill_zero<'a, K: Ord + Clone + 'a>(
    keys: impl IntoIterator<Item = &'a K>,
    source: &MetricTable<K>,
    metric: &str,
) -> Result<Vec<i64>, ReconError> {
    let idx = source.require_metric(metric)?;
    Ok(keys
        .into_iter()
        .map(|k| source.value(k, idx).unwrap_or(0))
        .collect())
}

/// The first source declaring `metric`.
pub fn find_source<'s, K: Ord + Clone>(
    sources: &[&'s MetricTable<K>],
    metric: &str,
) -> Result<&'s MetricTable<K>, ReconError> {
    sources
        .iter()
        .copied()
        .find(|s| s.has_metric(metric))
        .ok_or_else(|| ReconError::UnknownColumn {
            table: sources
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join("+"),
            column: metric.to_string(),
        })
}

/// Reconcile `base` targets against `achieved` sources.
///
/// Row set and order come from `base`. For each pair the achieved value is
/// taken from the first source declaring it, defaulting to zero, and
/// `remaining = target - achieved`.
pub fn reconcile<K: Ord + Clone>(
    base: &MetricTable<K>,
    achieved: &[&MetricTable<K>],
    pairs: &[DeltaPair],
) -> Result<Reconciliation<K>, ReconError> {
    let mut targets = Vec::with_capacity(pairs.len());
    let mut actuals = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let t_idx = base.require_metric(&pair.target)?;
        targets.push(base.rows().iter().map(|(_, v)| v[t_idx]).collect::<Vec<_>>());
        let source = find_source(achieved, &pair.achieved)?;
        actuals.push(left_join_fill_zero(base.keys(), source, &pair.achieved)?);
    }

    let rows = base
        .keys()
        .enumerate()
        .map(|(i, key)| {
            let target: Vec<i64> = targets.iter().map(|col| col[i]).collect();
            let achieved: Vec<i64> = actuals.iter().map(|col| col[i]).collect();
            let remaining = target.iter().zip(&achieved).map(|(t, a)| t - a).collect();
            ReconciledRow {
                key: key.clone(),
                target,
                achieved,
                remaining,
            }
        })
        .collect();

    let excluded: BTreeSet<&K> = achieved
        .iter()
        .flat_map(|s| s.keys())
        .filter(|k| !base.contains(k))
        .collect();
    if !excluded.is_empty() {
        tracing::warn!(
            base = %base.name,
            keys = excluded.len(),
            "achieved rows without a target were excluded"
        );
    }

    Ok(Reconciliation {
        pairs: pairs.to_vec(),
        rows,
        excluded_keys: excluded.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> MetricTable<i64> {
        let mut t = MetricTable::new("metas", ["meta_a", "meta_b"]);
        t.insert(5, vec![100, 100]);
        t.insert(8, vec![40, 0]);
        t
    }

    fn pairs() -> Vec<DeltaPair> {
        vec![
            DeltaPair::new("meta_a", "avance_a", "cupos_a"),
            DeltaPair::new("meta_b", "avance_b", "cupos_b"),
        ]
    }

    #[test]
    fn missing_achieved_counts_as_zero_and_overrun_goes_negative() {
        let mut a = MetricTable::new("tec", ["avance_a"]);
        a.insert(8, vec![10]);
        let mut b = MetricTable::new("nivel", ["avance_b"]);
        b.insert(5, vec![150]);

        let r = reconcile(&targets(), &[&a, &b], &pairs()).unwrap();
        assert_eq!(r.rows.len(), 2);
        assert_eq!(r.rows[0].key, 5);
        assert_eq!(r.rows[0].remaining, vec![100, -50]);
        assert_eq!(r.rows[1].remaining, vec![30, 0]);
        assert_eq!(r.totals(), vec![130, -50]);
        assert_eq!(r.excluded_keys, 0);
    }

    #[test]
    fn secondary_only_keys_are_excluded() {
        let mut a = MetricTable::new("tec", ["avance_a", "avance_b"]);
        a.insert(99, vec![1, 1]);
        a.insert(98, vec![1, 1]);
        let r = reconcile(&targets(), &[&a], &pairs()).unwrap();
        assert_eq!(r.rows.len(), 2);
        assert_eq!(r.excluded_keys, 2);
    }

    #[test]
    fn unknown_column_is_reported() {
        let a = MetricTable::new("tec", ["avance_a"]);
        let err = reconcile(&targets(), &[&a], &pairs()).unwrap_err();
        match err {
            ReconError::UnknownColumn { column, .. } => assert_eq!(column, "avance_b"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn left_join_preserves_key_order() {
        let mut s = MetricTable::new("s", ["m"]);
        s.insert(2, vec![7]);
        let keys = vec![3, 2, 1];
        assert_eq!(left_join_fill_zero(&keys, &s, "m").unwrap(), vec![0, 7, 0]);
    }
}
