mod common;

use kpi_formula::{CellValue, Computed, CrossEntitySnapshot, EntryValues, FieldDef, FormulaDriver};
use pretty_assertions::assert_eq;

use common::{eval, eval_number, row, scores};

#[test]
fn sum_items_skips_non_numeric_cells() {
    let values = scores(&[10.0.into(), "x".into(), 5.0.into()]);
    assert_eq!(eval("SUM_ITEMS(items, score)", &values), Computed::Number(15.0));
}

#[test]
fn numeric_text_cells_are_coerced() {
    let values = scores(&["10".into(), " 2.5 ".into(), true.into(), CellValue::Null]);
    assert_eq!(eval_number("SUM_ITEMS(items, score)", &values), 12.5);
    assert_eq!(eval_number("AVG_ITEMS(items, score)", &values), 6.25);
}

#[test]
fn reductions_over_a_column() {
    let values = scores(&[4.0.into(), (-1.0).into(), 9.0.into(), "n/a".into()]);
    assert_eq!(eval_number("SUM_ITEMS(items, score)", &values), 12.0);
    assert_eq!(eval_number("AVG_ITEMS(items, score)", &values), 4.0);
    assert_eq!(eval_number("MIN_ITEMS(items, score)", &values), -1.0);
    assert_eq!(eval_number("MAX_ITEMS(items, score)", &values), 9.0);
}

#[test]
fn keys_may_be_quoted_strings() {
    let values = scores(&[1.0.into(), 2.0.into()]);
    assert_eq!(eval_number("SUM_ITEMS('items', 'score')", &values), 3.0);
    assert_eq!(eval_number("SUM_ITEMS(\"items\", score)", &values), 3.0);
}

#[test]
fn count_items_counts_rows_or_present_cells() {
    let values = EntryValues::new().with_list(
        "items",
        vec![
            row(&[("name", "a".into()), ("score", 1.0.into())]),
            row(&[("name", CellValue::Null)]),
            row(&[("name", "c".into())]),
        ],
    );
    assert_eq!(eval_number("COUNT_ITEMS(items)", &values), 3.0);
    assert_eq!(eval_number("COUNT_ITEMS(items, name)", &values), 2.0);
    assert_eq!(eval_number("COUNT_ITEMS(items, score)", &values), 1.0);
}

#[test]
fn empty_lists_aggregate_to_zero() {
    let fields = vec![
        FieldDef::items("items", vec!["score"]),
        FieldDef::formula("sum", "SUM_ITEMS(items, score)"),
        FieldDef::formula("avg", "AVG_ITEMS(items, score)"),
        FieldDef::formula("min", "MIN_ITEMS(items, score)"),
        FieldDef::formula("max", "MAX_ITEMS(items, score)"),
        FieldDef::formula("count", "COUNT_ITEMS(items)"),
        FieldDef::formula("count_col", "COUNT_ITEMS(items, score)"),
    ];
    for values in [
        EntryValues::new(),
        EntryValues::new().with_list("items", Vec::new()),
    ] {
        let results =
            FormulaDriver::default().evaluate(&fields, &values, &CrossEntitySnapshot::new());
        assert_eq!(results.len(), 6);
        for field in results {
            assert_eq!(field.result, Computed::Number(0.0), "{}", field.key);
        }
    }
}

#[test]
fn columns_with_no_numeric_cells_aggregate_to_zero() {
    let values = scores(&["a".into(), "b".into()]);
    assert_eq!(eval_number("MIN_ITEMS(items, score)", &values), 0.0);
    assert_eq!(eval_number("MAX_ITEMS(items, score)", &values), 0.0);
    assert_eq!(eval_number("AVG_ITEMS(items, score)", &values), 0.0);
}

#[test]
fn undeclared_columns_of_an_empty_list_aggregate_to_zero() {
    let fields = vec![
        FieldDef::items("items", Vec::<String>::new()),
        FieldDef::formula("sum", "SUM_ITEMS(items, score)"),
        FieldDef::formula("max", "MAX_ITEMS(items, score)"),
        FieldDef::formula("count", "COUNT_ITEMS(items, score)"),
        FieldDef::formula("where", "SUM_ITEMS_WHERE(items, score, status, op_eq, 1)"),
        FieldDef::formula("quoted", "SUM_ITEMS(items, 'score')"),
    ];
    for values in [
        EntryValues::new(),
        EntryValues::new().with_list("items", Vec::new()),
    ] {
        let results =
            FormulaDriver::default().evaluate(&fields, &values, &CrossEntitySnapshot::new());
        for field in results {
            assert_eq!(field.result, Computed::Number(0.0), "{}", field.key);
        }
    }
}

#[test]
fn unknown_columns_of_a_populated_list_stay_undefined() {
    let values = scores(&[1.0.into()]);
    assert_eq!(eval("SUM_ITEMS(items, typo)", &values), Computed::Uncomputable);
    // Outside a key position the name is still just undefined.
    let values = EntryValues::new().with_list("items", Vec::new());
    assert_eq!(eval("SUM_ITEMS(items, score) + score", &values), Computed::Uncomputable);
}

#[test]
fn sub_keys_are_collected_across_all_rows_and_lists() {
    let values = EntryValues::new()
        .with_list(
            "tasks",
            vec![row(&[("hours", 2.0.into())]), row(&[("cost", 10.0.into())])],
        )
        .with_list("people", vec![row(&[("age", 30.0.into())])]);
    assert_eq!(eval_number("SUM_ITEMS(tasks, hours)", &values), 2.0);
    assert_eq!(eval_number("SUM_ITEMS(tasks, cost)", &values), 10.0);
    // `age` is only observed in `people`, but columns share one namespace.
    assert_eq!(eval_number("SUM_ITEMS(tasks, age)", &values), 0.0);
    assert_eq!(eval_number("SUM_ITEMS(people, age) + SUM_ITEMS(tasks, hours)", &values), 32.0);
}

#[test]
fn group_results_combine_with_scalars() {
    let values = scores(&[1.0.into(), 2.0.into(), 3.0.into()]).with_number("weight", 2.0);
    assert_eq!(
        eval_number("SUM_ITEMS(items, score) * weight / COUNT_ITEMS(items)", &values),
        4.0
    );
}

#[test]
fn numeric_key_arguments_are_type_mismatches() {
    let values = scores(&[1.0.into()]);
    assert_eq!(eval("SUM_ITEMS(items, 3)", &values), Computed::Uncomputable);
    assert_eq!(eval("SUM_ITEMS(missing, score)", &values), Computed::Uncomputable);
}
