//! The closed set of functions callable from a formula.
//!
//! There is no dynamic registry: a call site names one [`Function`] variant, resolved while
//! parsing, and the interpreter dispatches on it with a `match`.

use crate::engine::{FormulaError, FormulaResult};

pub(crate) mod conditional;
pub(crate) mod group;
pub(crate) mod scalar;

pub use conditional::CompareOp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Function {
    Sum,
    Avg,
    Count,
    Min,
    Max,
    Round,
    SumItems,
    AvgItems,
    CountItems,
    MinItems,
    MaxItems,
    SumItemsWhere,
    AvgItemsWhere,
    CountItemsWhere,
    MinItemsWhere,
    MaxItemsWhere,
    KpiField,
}

/// Reduction shared by the scalar, group and conditional families.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Aggregate {
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    /// Reduce `values`; an empty input yields `0.0` for every reduction.
    pub(crate) fn reduce(self, values: impl IntoIterator<Item = f64>) -> f64 {
        let mut count = 0usize;
        let mut acc: Option<f64> = None;
        for n in values {
            count += 1;
            acc = Some(match (self, acc) {
                (_, None) => n,
                (Aggregate::Sum | Aggregate::Avg, Some(a)) => a + n,
                (Aggregate::Min, Some(a)) => a.min(n),
                (Aggregate::Max, Some(a)) => a.max(n),
            });
        }
        match (self, acc) {
            (_, None) => 0.0,
            (Aggregate::Avg, Some(total)) => total / count as f64,
            (_, Some(v)) => v,
        }
    }
}

const ALL: &[Function] = &[
    Function::Sum,
    Function::Avg,
    Function::Count,
    Function::Min,
    Function::Max,
    Function::Round,
    Function::SumItems,
    Function::AvgItems,
    Function::CountItems,
    Function::MinItems,
    Function::MaxItems,
    Function::SumItemsWhere,
    Function::AvgItemsWhere,
    Function::CountItemsWhere,
    Function::MinItemsWhere,
    Function::MaxItemsWhere,
    Function::KpiField,
];

impl Function {
    pub fn all() -> &'static [Function] {
        ALL
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Sum => "SUM",
            Function::Avg => "AVG",
            Function::Count => "COUNT",
            Function::Min => "MIN",
            Function::Max => "MAX",
            Function::Round => "ROUND",
            Function::SumItems => "SUM_ITEMS",
            Function::AvgItems => "AVG_ITEMS",
            Function::CountItems => "COUNT_ITEMS",
            Function::MinItems => "MIN_ITEMS",
            Function::MaxItems => "MAX_ITEMS",
            Function::SumItemsWhere => "SUM_ITEMS_WHERE",
            Function::AvgItemsWhere => "AVG_ITEMS_WHERE",
            Function::CountItemsWhere => "COUNT_ITEMS_WHERE",
            Function::MinItemsWhere => "MIN_ITEMS_WHERE",
            Function::MaxItemsWhere => "MAX_ITEMS_WHERE",
            Function::KpiField => "KPI_FIELD",
        }
    }

    pub fn lookup(name: &str, case_insensitive: bool) -> Option<Function> {
        ALL.iter().copied().find(|f| {
            if case_insensitive {
                f.name().eq_ignore_ascii_case(name)
            } else {
                f.name() == name
            }
        })
    }

    /// Accepted argument counts as `(min, max)`; `None` means variadic.
    pub fn arity(self) -> (usize, Option<usize>) {
        match self {
            Function::Sum | Function::Avg | Function::Count | Function::Min | Function::Max => {
                (0, None)
            }
            Function::Round => (1, Some(2)),
            Function::SumItems
            | Function::AvgItems
            | Function::MinItems
            | Function::MaxItems
            | Function::KpiField => (2, Some(2)),
            Function::CountItems => (1, Some(2)),
            Function::CountItemsWhere => (4, Some(4)),
            Function::SumItemsWhere
            | Function::AvgItemsWhere
            | Function::MinItemsWhere
            | Function::MaxItemsWhere => (5, Some(5)),
        }
    }

    pub(crate) fn check_arity(self, got: usize) -> FormulaResult<()> {
        let (min, max) = self.arity();
        if got < min || max.is_some_and(|max| got > max) {
            return Err(FormulaError::Arity {
                function: self.name(),
                expected: match max {
                    Some(max) if max == min => format!("{min}"),
                    Some(max) => format!("{min} to {max}"),
                    None => format!("at least {min}"),
                },
                got,
            });
        }
        Ok(())
    }

    /// The reduction a scalar/group/conditional aggregate performs, if any.
    pub(crate) fn aggregate(self) -> Option<Aggregate> {
        match self {
            Function::Sum | Function::SumItems | Function::SumItemsWhere => Some(Aggregate::Sum),
            Function::Avg | Function::AvgItems | Function::AvgItemsWhere => Some(Aggregate::Avg),
            Function::Min | Function::MinItems | Function::MinItemsWhere => Some(Aggregate::Min),
            Function::Max | Function::MaxItems | Function::MaxItemsWhere => Some(Aggregate::Max),
            _ => None,
        }
    }
}
