//! Row filtering for the `*_ITEMS_WHERE` family.

use crate::coercion::coerce_number;
use crate::model::ItemRow;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// Parse `eq`, `op_eq`, `NEQ`, ... (the `op_` prefix and ASCII case are optional).
    pub fn parse(name: &str) -> Option<CompareOp> {
        let name = name.trim();
        let bare = match name.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("op_") => &name[3..],
            _ => name,
        };
        let op = match bare.to_ascii_lowercase().as_str() {
            "eq" => CompareOp::Eq,
            "neq" => CompareOp::Neq,
            "gt" => CompareOp::Gt,
            "gte" => CompareOp::Gte,
            "lt" => CompareOp::Lt,
            "lte" => CompareOp::Lte,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Neq => "neq",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
        }
    }

    pub fn compare(self, left: f64, right: f64) -> bool {
        match self {
            CompareOp::Eq => left == right,
            CompareOp::Neq => left != right,
            CompareOp::Gt => left > right,
            CompareOp::Gte => left >= right,
            CompareOp::Lt => left < right,
            CompareOp::Lte => left <= right,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `row` passes `row[filter_key] <op> compare_value`.
///
/// A missing or non-numeric filter cell is "not equal to anything": it only matches `neq`.
pub(crate) fn row_matches(
    row: &ItemRow,
    filter_key: &str,
    op: CompareOp,
    compare_value: f64,
) -> bool {
    match row.get(filter_key).and_then(coerce_number) {
        Some(cell) => op.compare(cell, compare_value),
        None => op == CompareOp::Neq,
    }
}

pub(crate) fn filter_rows<'r>(
    rows: &'r [ItemRow],
    filter_key: &'r str,
    op: CompareOp,
    compare_value: f64,
) -> impl Iterator<Item = &'r ItemRow> + 'r {
    rows.iter()
        .filter(move |row| row_matches(row, filter_key, op, compare_value))
}
