use std::cmp::Ordering;
use std::collections::BTreeMap;

use metagrid_engine::geocode::department_code;

use crate::model::{RollupRow, AGGREGATE_CHILD};

/// Display-name ordering: byte-wise over ASCII-lower-cased UTF-8, missing
/// names last.
pub fn collate(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => {
            let xs = x.bytes().map(|c| c.to_ascii_lowercase());
            let ys = y.bytes().map(|c| c.to_ascii_lowercase());
            xs.cmp(ys)
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Group detail rows by parent code and emit, per parent in ascending code
/// order, one aggregate row followed by its children ordered by name.
pub fn rollup(details: Vec<RollupRow>) -> Vec<RollupRow> {
    let mut groups: BTreeMap<i64, Vec<RollupRow>> = BTreeMap::new();
    for row in details {
        groups.entry(row.parent_code).or_default().push(row);
    }

    let mut out = Vec::new();
    for (parent, mut children) in groups {
        let width = children.iter().map(|c| c.metrics.len()).max().unwrap_or(0);
        let mut sums = vec![0i64; width];
        for child in &children {
            for (s, v) in sums.iter_mut().zip(&child.metrics) {
                *s += v;
            }
        }
        let parent_name = children
            .iter()
            .find_map(|c| c.parent_name.as_deref().filter(|n| !n.trim().is_empty()))
            .map(String::from);

        children.sort_by(|a, b| {
            collate(a.child_name.as_deref(), b.child_name.as_deref())
                .then(a.child_code.cmp(&b.child_code))
        });

        out.push(RollupRow {
            parent_code: parent,
            child_code: AGGREGATE_CHILD,
            parent_name,
            child_name: None,
            geo: department_code(&parent),
            metrics: sums,
            is_aggregate: true,
        });
        out.extend(children);
    }
    out
}

/// Column-wise sums over detail rows only.
pub fn detail_totals(rows: &[RollupRow]) -> Vec<i64> {
    let width = rows.iter().map(|r| r.metrics.len()).max().unwrap_or(0);
    let mut totals = vec![0i64; width];
    for row in rows.iter().filter(|r| !r.is_aggregate) {
        for (t, v) in totals.iter_mut().zip(&row.metrics) {
            *t += v;
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use metagrid_engine::geocode::municipality_code;
    use proptest::prelude::*;

    fn child(dept: i64, mpio: i64, dept_name: Option<&str>, name: Option<&str>, v: i64) -> RollupRow {
        RollupRow {
            parent_code: dept,
            child_code: mpio,
            parent_name: dept_name.map(String::from),
            child_name: name.map(String::from),
            geo: municipality_code(&dept, &mpio),
            metrics: vec![v],
            is_aggregate: false,
        }
    }

    #[test]
    fn aggregate_precedes_its_children() {
        let rows = rollup(vec![
            child(5, 3, Some("ANTIOQUIA"), Some("c"), 3),
            child(5, 1, Some("ANTIOQUIA"), Some("a"), 4),
            child(5, 2, Some("ANTIOQUIA"), Some("b"), 5),
        ]);
        assert_eq!(rows.len(), 4);
        assert!(rows[0].is_aggregate);
        assert_eq!(rows[0].metrics, vec![12]);
        assert_eq!(rows[0].child_code, 0);
        assert_eq!(rows[0].geo.as_str(), "05000");
        assert_eq!(rows[0].child_name, None);
        let names: Vec<_> = rows[1..].iter().map(|r| r.child_name.clone().unwrap()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn parents_ascending_and_name_from_first_named_child() {
        let rows = rollup(vec![
            child(25, 1, None, Some("x"), 1),
            child(25, 2, Some("CUNDINAMARCA"), Some("y"), 1),
            child(8, 1, Some("ATLANTICO"), Some("z"), 1),
        ]);
        assert_eq!(rows[0].parent_code, 8);
        assert_eq!(rows[2].parent_code, 25);
        assert!(rows[2].is_aggregate);
        assert_eq!(rows[2].parent_name.as_deref(), Some("CUNDINAMARCA"));
    }

    #[test]
    fn unnamed_children_sort_last_then_by_code() {
        let rows = rollup(vec![
            child(5, 9, None, None, 1),
            child(5, 4, None, None, 1),
            child(5, 7, None, Some("Zona"), 1),
        ]);
        let codes: Vec<_> = rows[1..].iter().map(|r| r.child_code).collect();
        assert_eq!(codes, vec![7, 4, 9]);
    }

    #[test]
    fn collation_ignores_ascii_case_only() {
        assert_eq!(collate(Some("abc"), Some("ABD")), Ordering::Less);
        assert_eq!(collate(Some("Medellín"), Some("MEDELLÍN")), Ordering::Greater);
        assert_eq!(collate(Some("z"), None), Ordering::Less);
    }

    #[test]
    fn totals_skip_aggregates() {
        let rows = rollup(vec![child(5, 1, None, None, 2), child(8, 1, None, None, 3)]);
        assert_eq!(detail_totals(&rows), vec![5]);
    }

    proptest! {
        #[test]
        fn aggregate_equals_sum_of_children(values in proptest::collection::vec(-1000i64..1000, 1..20)) {
            let details: Vec<_> = values
                .iter()
                .enumerate()
                .map(|(i, v)| child(5, i as i64 + 1, None, None, *v))
                .collect();
            let rows = rollup(details);
            prop_assert_eq!(rows.len(), values.len() + 1);
            prop_assert_eq!(rows[0].metrics[0], values.iter().sum::<i64>());
        }

        #[test]
        fn collate_is_antisymmetric(a in ".{0,8}", b in ".{0,8}") {
            prop_assert_eq!(collate(Some(&a), Some(&b)), collate(Some(&b), Some(&a)).reverse());
        }
    }
}
