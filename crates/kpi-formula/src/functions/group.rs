//! Reductions over one column of a list field's rows.

use super::Aggregate;
use crate::coercion::coerce_number;
use crate::model::ItemRow;

/// Reduce the numeric cells of `sub_key`; missing and non-numeric cells are skipped and an empty
/// selection yields `0.0`.
pub(crate) fn aggregate_items<'r>(
    agg: Aggregate,
    rows: impl IntoIterator<Item = &'r ItemRow>,
    sub_key: &str,
) -> f64 {
    agg.reduce(
        rows.into_iter()
            .filter_map(|row| row.get(sub_key).and_then(coerce_number)),
    )
}

/// Row count when `sub_key` is `None`, otherwise the number of rows with a non-null
/// `sub_key` cell.
pub(crate) fn count_items<'r>(
    rows: impl IntoIterator<Item = &'r ItemRow>,
    sub_key: Option<&str>,
) -> f64 {
    let rows = rows.into_iter();
    let n = match sub_key {
        None => rows.count(),
        Some(key) => rows
            .filter(|row| row.get(key).is_some_and(|cell| !cell.is_null()))
            .count(),
    };
    n as f64
}
