//! Formula interpreter.
//!
//! Evaluation walks the [`Expr`] tree against an [`EvalContext`]: the namespace built by the
//! driver, the cross-entity snapshot and the active [`EvaluatorConfig`]. Identifier lookup has
//! exactly two outcomes, a binding or [`FormulaError::UndefinedName`], and every fault travels
//! up as a `FormulaError` until the driver turns it into [`crate::Computed::Uncomputable`].
use crate::coercion::coerce_value;
use crate::config::EvaluatorConfig;
use crate::cross_entity::{CrossEntitySnapshot, EntityId};
use crate::functions::{conditional, group, scalar, CompareOp, Function};
use crate::guard::{self, GuardOutcome};
use crate::namespace::{Binding, Namespace};
use crate::parser::{BinaryOp, Expr, UnaryOp};
use crate::value::Value;

pub type FormulaResult<T> = Result<T, FormulaError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("expression is empty")]
    EmptyExpression,

    #[error("disallowed character {0:?} in expression")]
    SyntaxRejected(char),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("expression too complex: {0}")]
    TooComplex(String),

    #[error("undefined name: {0}")]
    UndefinedName(String),

    #[error("arithmetic fault: {0}")]
    ArithmeticFault(String),

    #[error("type error: {0}")]
    TypeMismatch(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("{function} expects {expected} argument(s), got {got}")]
    Arity {
        function: &'static str,
        expected: String,
        got: usize,
    },
}

/// Coarse classification of [`FormulaError`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormulaErrorKind {
    /// Disallowed characters, malformed syntax or limits exceeded.
    SyntaxRejected,
    EmptyExpression,
    UndefinedReference,
    ArithmeticFault,
    TypeMismatch,
    /// Unknown function or wrong number of arguments.
    MalformedCall,
}

impl FormulaError {
    pub fn kind(&self) -> FormulaErrorKind {
        match self {
            FormulaError::EmptyExpression => FormulaErrorKind::EmptyExpression,
            FormulaError::SyntaxRejected(_)
            | FormulaError::Parse(_)
            | FormulaError::TooComplex(_) => FormulaErrorKind::SyntaxRejected,
            FormulaError::UndefinedName(_) => FormulaErrorKind::UndefinedReference,
            FormulaError::ArithmeticFault(_) => FormulaErrorKind::ArithmeticFault,
            FormulaError::TypeMismatch(_) => FormulaErrorKind::TypeMismatch,
            FormulaError::UnknownFunction(_) | FormulaError::Arity { .. } => {
                FormulaErrorKind::MalformedCall
            }
        }
    }
}

/// Everything one evaluation may read. Nothing in it is mutated while interpreting.
#[derive(Clone, Copy, Debug)]
pub struct EvalContext<'a> {
    pub namespace: &'a Namespace<'a>,
    pub cross_entity: &'a CrossEntitySnapshot,
    pub config: &'a EvaluatorConfig,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        namespace: &'a Namespace<'a>,
        cross_entity: &'a CrossEntitySnapshot,
        config: &'a EvaluatorConfig,
    ) -> Self {
        Self {
            namespace,
            cross_entity,
            config,
        }
    }

    fn eval(&self, expr: &Expr) -> FormulaResult<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Text(s) => Ok(Value::Text(s.clone())),
            Expr::Identifier(name) => match self.namespace.lookup(name) {
                Some(Binding::Number(n)) => Ok(Value::Number(n)),
                Some(Binding::List) => Ok(Value::List(name.clone())),
                Some(Binding::Column) => Ok(Value::Column(name.clone())),
                None => Err(FormulaError::UndefinedName(name.clone())),
            },
            Expr::UnaryOp { op, expr } => {
                let n = self.eval_number(expr, "unary operand")?;
                Ok(Value::Number(match op {
                    UnaryOp::Plus => n,
                    UnaryOp::Negate => -n,
                }))
            }
            Expr::BinaryOp { op, left, right } => {
                let l = self.eval_number(left, "left operand")?;
                let r = self.eval_number(right, "right operand")?;
                let out = match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Subtract => l - r,
                    BinaryOp::Multiply => l * r,
                    BinaryOp::Divide => {
                        if r == 0.0 {
                            return Err(FormulaError::ArithmeticFault("division by zero".into()));
                        }
                        l / r
                    }
                    BinaryOp::FloorDivide => {
                        if r == 0.0 {
                            return Err(FormulaError::ArithmeticFault("division by zero".into()));
                        }
                        (l / r).floor()
                    }
                    BinaryOp::Power => power(l, r)?,
                };
                Ok(Value::Number(out))
            }
            Expr::Call { function, args } => self.eval_call(*function, args).map(Value::Number),
        }
    }

    /// Arithmetic operands must already be numbers; text and identifier tokens are not coerced.
    fn eval_number(&self, expr: &Expr, role: &str) -> FormulaResult<f64> {
        match self.eval(expr)? {
            Value::Number(n) => Ok(n),
            other => Err(FormulaError::TypeMismatch(format!(
                "{role} must be a number, got {}",
                other.type_name()
            ))),
        }
    }

    fn eval_all(&self, args: &[Expr]) -> FormulaResult<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    fn eval_call(&self, function: Function, args: &[Expr]) -> FormulaResult<f64> {
        // Arity is checked while parsing; re-check for hand-built trees.
        function.check_arity(args.len())?;

        match function {
            Function::Sum | Function::Avg | Function::Min | Function::Max => {
                let values = self.eval_all(args)?;
                let agg = function
                    .aggregate()
                    .ok_or_else(|| FormulaError::UnknownFunction(function.name().into()))?;
                Ok(scalar::aggregate(agg, &values))
            }
            Function::Count => Ok(scalar::count(&self.eval_all(args)?)),
            Function::Round => {
                let values = self.eval_all(args)?;
                scalar::round(&values[0], values.get(1))
            }
            Function::SumItems | Function::AvgItems | Function::MinItems | Function::MaxItems => {
                let list = self.key_arg(&args[0])?;
                let sub_key = self.sub_key_arg(&args[1], &list)?;
                let agg = function
                    .aggregate()
                    .ok_or_else(|| FormulaError::UnknownFunction(function.name().into()))?;
                Ok(group::aggregate_items(agg, self.namespace.rows(&list), &sub_key))
            }
            Function::CountItems => {
                let list = self.key_arg(&args[0])?;
                let sub_key = args
                    .get(1)
                    .map(|arg| self.sub_key_arg(arg, &list))
                    .transpose()?;
                Ok(group::count_items(self.namespace.rows(&list), sub_key.as_deref()))
            }
            Function::SumItemsWhere
            | Function::AvgItemsWhere
            | Function::MinItemsWhere
            | Function::MaxItemsWhere => {
                let list = self.key_arg(&args[0])?;
                let value_key = self.sub_key_arg(&args[1], &list)?;
                let filter_key = self.sub_key_arg(&args[2], &list)?;
                let op = self.operator_arg(&args[3])?;
                let compare_value = self.compare_value_arg(&args[4])?;
                let agg = function
                    .aggregate()
                    .ok_or_else(|| FormulaError::UnknownFunction(function.name().into()))?;
                let rows = self.namespace.rows(&list);
                Ok(group::aggregate_items(
                    agg,
                    conditional::filter_rows(rows, &filter_key, op, compare_value),
                    &value_key,
                ))
            }
            Function::CountItemsWhere => {
                let list = self.key_arg(&args[0])?;
                let filter_key = self.sub_key_arg(&args[1], &list)?;
                let op = self.operator_arg(&args[2])?;
                let compare_value = self.compare_value_arg(&args[3])?;
                let rows = self.namespace.rows(&list);
                Ok(group::count_items(
                    conditional::filter_rows(rows, &filter_key, op, compare_value),
                    None,
                ))
            }
            Function::KpiField => {
                let entity = self.eval(&args[0])?;
                let field_key = match self.eval(&args[1])? {
                    Value::Text(key) => key,
                    other => {
                        return Err(FormulaError::TypeMismatch(format!(
                            "KPI_FIELD field key must be a quoted string, got {}",
                            other.type_name()
                        )))
                    }
                };
                Ok(match entity_id(&entity) {
                    Some(id) => self.cross_entity.get(id, &field_key),
                    None => 0.0,
                })
            }
        }
    }

    /// A list-field or sub-field key: a bound bare identifier names itself, a string literal
    /// names its contents.
    fn key_arg(&self, expr: &Expr) -> FormulaResult<String> {
        if let Expr::Identifier(name) = expr {
            if !self.namespace.is_bound(name) {
                return Err(FormulaError::UndefinedName(name.clone()));
            }
            return Ok(name.clone());
        }
        match self.eval(expr)? {
            Value::Text(key) | Value::List(key) | Value::Column(key) => Ok(key),
            Value::Number(n) => Err(FormulaError::TypeMismatch(format!(
                "expected a field key, got number {n}"
            ))),
        }
    }

    /// A sub-field key of `list`. When the list has no rows, nothing could have bound its
    /// columns, so an unbound bare identifier still names itself and the aggregate sees no cells.
    fn sub_key_arg(&self, expr: &Expr, list: &str) -> FormulaResult<String> {
        match expr {
            Expr::Identifier(name)
                if !self.namespace.is_bound(name) && self.namespace.rows(list).is_empty() =>
            {
                Ok(name.clone())
            }
            _ => self.key_arg(expr),
        }
    }

    fn operator_arg(&self, expr: &Expr) -> FormulaResult<CompareOp> {
        if let Expr::Identifier(name) = expr {
            if let Some(op) = CompareOp::parse(name) {
                return Ok(op);
            }
        }
        match self.eval(expr)? {
            Value::Text(name) => CompareOp::parse(&name).ok_or_else(|| {
                FormulaError::TypeMismatch(format!("unknown comparison operator {name:?}"))
            }),
            other => Err(FormulaError::TypeMismatch(format!(
                "expected a comparison operator, got {}",
                other.type_name()
            ))),
        }
    }

    fn compare_value_arg(&self, expr: &Expr) -> FormulaResult<f64> {
        let value = self.eval(expr)?;
        coerce_value(&value).ok_or_else(|| {
            FormulaError::TypeMismatch(format!(
                "comparison value must be numeric, got {value}"
            ))
        })
    }
}

/// Operands beyond this magnitude are refused instead of computing huge powers.
const MAX_POWER_OPERAND: f64 = 4_000_000.0;

fn power(base: f64, exponent: f64) -> FormulaResult<f64> {
    if base.abs() > MAX_POWER_OPERAND || exponent.abs() > MAX_POWER_OPERAND {
        return Err(FormulaError::ArithmeticFault(format!(
            "power operands too large: {base} ** {exponent}"
        )));
    }
    if base == 0.0 && exponent < 0.0 {
        return Err(FormulaError::ArithmeticFault("zero raised to a negative power".into()));
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(FormulaError::ArithmeticFault(format!(
            "negative base {base} with fractional exponent {exponent}"
        )));
    }
    Ok(base.powf(exponent))
}

/// Entity ids are integers; anything else cannot match a snapshot entry.
fn entity_id(value: &Value) -> Option<EntityId> {
    let n = coerce_value(value)?;
    if n.fract() != 0.0 || n < EntityId::MIN as f64 || n > EntityId::MAX as f64 {
        return None;
    }
    Some(n as EntityId)
}

/// Interpret a parsed expression. The result must be a number; with
/// [`EvaluatorConfig::require_finite_results`] it must also be finite.
pub fn evaluate_expr(expr: &Expr, ctx: &EvalContext<'_>) -> FormulaResult<f64> {
    let n = match ctx.eval(expr)? {
        Value::Number(n) => n,
        other => {
            return Err(FormulaError::TypeMismatch(format!(
                "formula must produce a number, got {}",
                other.type_name()
            )))
        }
    };
    if ctx.config.require_finite_results && !n.is_finite() {
        return Err(FormulaError::ArithmeticFault(format!("non-finite result {n}")));
    }
    Ok(n)
}

/// Run the whole pipeline (guard, parse, interpret) and report why a formula fails.
///
/// The driver swallows these errors; this entry point exists for callers that need to tell a
/// user what is wrong with an expression.
pub fn check_expression(
    expression: &str,
    namespace: &Namespace<'_>,
    cross_entity: &CrossEntitySnapshot,
    config: &EvaluatorConfig,
) -> FormulaResult<f64> {
    match guard::classify(expression) {
        GuardOutcome::Empty => return Err(FormulaError::EmptyExpression),
        GuardOutcome::Rejected { offending } => {
            log::debug!("formula rejected by the character guard: {offending:?}");
            return Err(FormulaError::SyntaxRejected(offending));
        }
        GuardOutcome::Accepted => {}
    }
    let expr = crate::parser::parse_with_config(expression.trim(), config)?;
    let ctx = EvalContext::new(namespace, cross_entity, config);
    evaluate_expr(&expr, &ctx)
}
