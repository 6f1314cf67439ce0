//! Sandboxed evaluator for KPI formula fields.
//!
//! A formula field computes one number from values already collected for the same entity
//! (scalar fields, multi-line item lists and earlier formula fields) plus numbers computed for
//! sibling entities. Expressions are checked against a character allow-list, parsed into a small
//! closed AST and interpreted against an explicit [`EvalContext`]; nothing in the language can
//! reach host code.
//!
//! The [`FormulaDriver`] walks an entity's fields in declaration order and never fails: any
//! problem with a formula turns into [`Computed::Uncomputable`] so saving the rest of the entry
//! is never blocked. Use [`check_expression`] when the actual [`FormulaError`] is wanted (for
//! example to flag a broken formula while it is being authored).

mod coercion;
mod config;
mod cross_entity;
mod driver;
mod engine;
mod functions;
mod guard;
mod model;
mod namespace;
mod parser;
mod value;

pub use crate::coercion::coerce_number;
pub use crate::config::EvaluatorConfig;
pub use crate::cross_entity::{CrossEntitySnapshot, CrossEntityValue, EntityId, SiblingEntry};
pub use crate::driver::{Computed, ComputedField, EntityInput, EntityResult, FormulaDriver};
pub use crate::engine::{
    check_expression, evaluate_expr, EvalContext, FormulaError, FormulaErrorKind, FormulaResult,
};
pub use crate::functions::{CompareOp, Function};
pub use crate::guard::{classify, validate, GuardOutcome};
pub use crate::model::{EntryValues, FieldDef, FieldKind, ItemRow};
pub use crate::namespace::{Binding, Namespace};
pub use crate::parser::{parse, parse_with_config, BinaryOp, Expr, UnaryOp};
pub use crate::value::{CellValue, Value};
