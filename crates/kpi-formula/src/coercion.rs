use crate::value::{CellValue, Value};

/// Best-effort conversion of a stored cell to a number.
///
/// Numbers pass through, text is parsed as a float literal after trimming, and everything else
/// (booleans, dates, nulls, nested JSON) is not numeric. Text that parses to a non-finite value
/// (`"inf"`, `"NaN"`) is not numeric either.
pub fn coerce_number(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(s) => parse_numeric_text(s),
        CellValue::Json(serde_json::Value::Number(n)) => n.as_f64(),
        CellValue::Null | CellValue::Bool(_) | CellValue::Date(_) | CellValue::Json(_) => None,
    }
}

/// Same policy as [`coerce_number`] for interpreter values. Identifier tokens are never numeric.
pub(crate) fn coerce_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::Text(s) => parse_numeric_text(s),
        Value::List(_) | Value::Column(_) => None,
    }
}

fn parse_numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn numbers_pass_through() {
        assert_eq!(coerce_number(&CellValue::Number(3.5)), Some(3.5));
        assert_eq!(coerce_number(&CellValue::Number(-0.0)), Some(-0.0));
    }

    #[test]
    fn text_is_trimmed_and_parsed() {
        assert_eq!(coerce_number(&"  42 ".into()), Some(42.0));
        assert_eq!(coerce_number(&"1e3".into()), Some(1000.0));
        assert_eq!(coerce_number(&"-.5".into()), Some(-0.5));
        assert_eq!(coerce_number(&"x".into()), None);
        assert_eq!(coerce_number(&"".into()), None);
        assert_eq!(coerce_number(&"12 apples".into()), None);
        assert_eq!(coerce_number(&"inf".into()), None);
        assert_eq!(coerce_number(&"NaN".into()), None);
    }

    #[test]
    fn non_numeric_kinds() {
        assert_eq!(coerce_number(&CellValue::Bool(true)), None);
        assert_eq!(coerce_number(&CellValue::Null), None);
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(coerce_number(&CellValue::Date(date)), None);
        assert_eq!(
            coerce_number(&CellValue::Json(serde_json::json!([1, 2]))),
            None
        );
    }

    #[test]
    fn identifier_tokens_are_not_numeric() {
        assert_eq!(coerce_value(&Value::List("items".into())), None);
        assert_eq!(coerce_value(&Value::Text(" 7 ".into())), Some(7.0));
    }
}
