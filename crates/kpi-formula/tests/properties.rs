mod common;

use kpi_formula::{CellValue, Computed, EntryValues, FieldDef};
use proptest::prelude::*;

use common::{eval, row};

fn small() -> impl Strategy<Value = f64> {
    // Integers keep sums exact so the laws can be checked with `==`.
    (-1_000i32..1_000).prop_map(f64::from)
}

fn cell() -> impl Strategy<Value = CellValue> {
    prop_oneof![
        small().prop_map(CellValue::Number),
        small().prop_map(|n| CellValue::Text(format!(" {n} "))),
        "[a-z]{0,4}".prop_map(CellValue::Text),
        any::<bool>().prop_map(CellValue::Bool),
        Just(CellValue::Null),
    ]
}

fn values_abc(a: f64, b: f64, c: f64) -> EntryValues {
    EntryValues::new()
        .with_number("a", a)
        .with_number("b", b)
        .with_number("c", c)
}

proptest! {
    #[test]
    fn arithmetic_matches_direct_evaluation(a in small(), b in small(), c in small()) {
        let values = values_abc(a, b, c);
        prop_assert_eq!(eval("a + b * c", &values), Computed::Number(a + b * c));
        prop_assert_eq!(eval("(a - b) * c", &values), Computed::Number((a - b) * c));
        prop_assert_eq!(eval("a + b", &values), eval("b + a", &values));
        prop_assert_eq!(eval("(a + b) + c", &values), eval("a + (b + c)", &values));
        prop_assert_eq!(eval("a * b", &values), eval("b * a", &values));
        prop_assert_eq!(eval("(a * b) * c", &values), eval("a * (b * c)", &values));
    }

    #[test]
    fn division_is_uncomputable_exactly_when_the_divisor_is_zero(a in small(), b in small()) {
        let values = values_abc(a, b, 0.0);
        let expected = if b == 0.0 { Computed::Uncomputable } else { Computed::Number(a / b) };
        prop_assert_eq!(eval("a / b", &values), expected);
    }

    #[test]
    fn disallowed_characters_always_reject(
        prefix in "[a-z ]{0,6}",
        bad in prop::sample::select(vec![
            ';', '=', '[', ']', '{', '}', '|', '&', '$', '`',
            '%', '<', '>', '!', '@', '#', '\\', ':',
        ]),
        suffix in "[a-z0-9 ]{0,6}",
    ) {
        let values = values_abc(1.0, 2.0, 3.0);
        let expr = format!("a + b{prefix}{bad}{suffix}");
        prop_assert_eq!(eval(&expr, &values), Computed::Uncomputable);
    }

    #[test]
    fn group_functions_are_total_over_arbitrary_rows(
        cells in prop::collection::vec(cell(), 0..12),
    ) {
        let rows: Vec<_> = cells.iter().map(|c| row(&[("v", c.clone())])).collect();
        let numeric: Vec<f64> = cells.iter().filter_map(kpi_formula::coerce_number).collect();
        let present = cells.iter().filter(|c| !c.is_null()).count() as f64;
        let values = EntryValues::new().with_list("items", rows);
        let fields = |expr: &str| {
            vec![FieldDef::items("items", vec!["v"]), FieldDef::formula("r", expr)]
        };
        let run = |expr: &str| {
            kpi_formula::FormulaDriver::default()
                .evaluate(&fields(expr), &values, &kpi_formula::CrossEntitySnapshot::new())[0]
                .result
        };

        let sum: f64 = numeric.iter().sum();
        prop_assert_eq!(run("SUM_ITEMS(items, v)"), Computed::Number(sum));
        prop_assert_eq!(run("COUNT_ITEMS(items)"), Computed::Number(cells.len() as f64));
        prop_assert_eq!(run("COUNT_ITEMS(items, v)"), Computed::Number(present));
        let expected_min = numeric.iter().copied().reduce(f64::min).unwrap_or(0.0);
        prop_assert_eq!(run("MIN_ITEMS(items, v)"), Computed::Number(expected_min));
        prop_assert!(run("AVG_ITEMS(items, v)").as_number().is_some());
        prop_assert_eq!(
            run("COUNT_ITEMS_WHERE(items, v, op_eq, 0) + COUNT_ITEMS_WHERE(items, v, op_neq, 0)"),
            Computed::Number(cells.len() as f64)
        );
    }
}
