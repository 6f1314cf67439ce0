//! `SUM`, `AVG`, `COUNT`, `MIN`, `MAX` and `ROUND` over already evaluated arguments.

use super::Aggregate;
use crate::engine::{FormulaError, FormulaResult};
use crate::value::Value;

/// Non-numeric arguments (text literals, list/sub-field tokens) are skipped.
pub(crate) fn aggregate(agg: Aggregate, args: &[Value]) -> f64 {
    agg.reduce(args.iter().filter_map(Value::as_number))
}

/// Every evaluated argument is non-null, numeric or not.
pub(crate) fn count(args: &[Value]) -> f64 {
    args.len() as f64
}

/// Largest power of ten that is exact as an `f64`.
const MAX_EXACT_POW10: i32 = 22;

/// Round to `digits` decimal places, ties to even (negative digits round to tens, hundreds, ...).
///
/// Ties are decided on the exact value of `n * 10^digits`, not on its rounded product, so
/// `ROUND(0.125, 2)` is `0.12` while `ROUND(2.675, 2)` is `2.67` (the stored double is below
/// the tie).
pub(crate) fn round(value: &Value, digits: Option<&Value>) -> FormulaResult<f64> {
    let n = value.as_number().ok_or_else(|| {
        FormulaError::TypeMismatch(format!("ROUND expects a number, got {}", value.type_name()))
    })?;
    let digits = match digits {
        None => 0,
        Some(d) => {
            let d = d.as_number().ok_or_else(|| {
                FormulaError::TypeMismatch(format!(
                    "ROUND digits must be a number, got {}",
                    d.type_name()
                ))
            })?;
            if d.fract() != 0.0 || !d.is_finite() {
                return Err(FormulaError::TypeMismatch(format!(
                    "ROUND digits must be an integer, got {d}"
                )));
            }
            // Beyond this range the factor is 0 or inf and rounding is meaningless.
            d.clamp(-308.0, 308.0) as i32
        }
    };
    if digits == 0 || !n.is_finite() {
        return Ok(n.round_ties_even());
    }

    let factor = 10f64.powi(digits.abs());
    let exact_factor = digits.abs() <= MAX_EXACT_POW10;
    Ok(if digits > 0 {
        let scaled = n * factor;
        if !scaled.is_finite() {
            return Ok(n);
        }
        // `scaled + error` is the exact product.
        let error = if exact_factor {
            n.mul_add(factor, -scaled)
        } else {
            0.0
        };
        ties_to_even(scaled, error) / factor
    } else {
        let quotient = n / factor;
        // `quotient * factor - n` is exact for a correctly rounded quotient.
        let residual = if exact_factor {
            quotient.mul_add(factor, -n)
        } else {
            0.0
        };
        ties_to_even(quotient, -residual) * factor
    })
}

/// Round `approx` to an integer, where `approx + error` is the true value and `error` is far
/// smaller than one unit.
fn ties_to_even(approx: f64, error: f64) -> f64 {
    if (approx - approx.trunc()).abs() != 0.5 || error == 0.0 {
        return approx.round_ties_even();
    }
    if error > 0.0 {
        approx.ceil()
    } else {
        approx.floor()
    }
}
