#![no_main]

use libfuzzer_sys::fuzz_target;

use kpi_formula::{
    CellValue, Computed, CrossEntitySnapshot, EntryValues, FieldDef, FormulaDriver, ItemRow,
};

/// Keep evaluation fuzzing bounded; group functions are linear in the row count anyway.
const MAX_EVAL_FORMULA_CHARS: usize = 2_048;
const MAX_INPUT_BYTES: usize = MAX_EVAL_FORMULA_CHARS * 4; // max UTF-8 bytes per char

fn row(amount: CellValue, status: CellValue) -> ItemRow {
    ItemRow::from([
        ("amount".to_string(), amount),
        ("status".to_string(), status),
    ])
}

fuzz_target!(|data: &[u8]| {
    let data = &data[..data.len().min(MAX_INPUT_BYTES)];
    let input = String::from_utf8_lossy(data);
    let expression: String = input.chars().take(MAX_EVAL_FORMULA_CHARS).collect();

    let fields = vec![
        FieldDef::number("a"),
        FieldDef::number("zero"),
        FieldDef::number("missing"),
        FieldDef::text("notes"),
        FieldDef::items("lines", vec!["amount", "status"]),
        FieldDef::formula("f", expression.clone()),
        // Anything downstream of a fuzzed formula must still be total.
        FieldDef::formula("g", "f * 2 + COUNT_ITEMS(lines)"),
    ];
    let values = EntryValues::new()
        .with_number("a", 1.5)
        .with_number("zero", 0.0)
        .with_scalar("missing", None)
        .with_list(
            "lines",
            vec![
                row(CellValue::Number(3.0), CellValue::from("open")),
                row(CellValue::from(" 4.5 "), CellValue::Number(1.0)),
                row(CellValue::Null, CellValue::Bool(true)),
                row(CellValue::from("inf"), CellValue::Number(f64::MAX)),
            ],
        );
    let snapshot = CrossEntitySnapshot::new()
        .with_value(1, "revenue", 10.0)
        .with_value(-1, "revenue", f64::MAX);

    let results = FormulaDriver::default().evaluate(&fields, &values, &snapshot);
    assert_eq!(results.len(), 2);
    for field in &results {
        if let Computed::Number(n) = field.result {
            assert!(n.is_finite(), "non-finite result for {expression:?}");
        }
    }
});
