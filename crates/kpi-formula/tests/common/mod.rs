#![allow(dead_code)]

use kpi_formula::{
    CellValue, Computed, CrossEntitySnapshot, EntryValues, FieldDef, FormulaDriver, ItemRow,
};

pub fn row(cells: &[(&str, CellValue)]) -> ItemRow {
    cells
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

/// Declares every stored scalar and list of `values` (sorted by key) ahead of one formula field
/// named `result`.
pub fn fields_for(values: &EntryValues, expression: &str) -> Vec<FieldDef> {
    let mut scalar_keys: Vec<&String> = values.scalars.keys().collect();
    scalar_keys.sort();
    let mut list_keys: Vec<&String> = values.lists.keys().collect();
    list_keys.sort();

    let mut fields: Vec<FieldDef> = scalar_keys.into_iter().map(FieldDef::number).collect();
    fields.extend(
        list_keys
            .into_iter()
            .map(|key| FieldDef::items(key, Vec::<String>::new())),
    );
    fields.push(FieldDef::formula("result", expression));
    fields
}

pub fn eval_with(
    expression: &str,
    values: &EntryValues,
    cross_entity: &CrossEntitySnapshot,
) -> Computed {
    let fields = fields_for(values, expression);
    let results = FormulaDriver::default().evaluate(&fields, values, cross_entity);
    let [only] = results.as_slice() else {
        panic!("expected one formula result, got {results:?}");
    };
    assert_eq!(only.key, "result");
    only.result
}

pub fn eval(expression: &str, values: &EntryValues) -> Computed {
    eval_with(expression, values, &CrossEntitySnapshot::new())
}

pub fn eval_number(expression: &str, values: &EntryValues) -> f64 {
    match eval(expression, values) {
        Computed::Number(n) => n,
        Computed::Uncomputable => panic!("{expression} was uncomputable"),
    }
}

pub fn scores(cells: &[CellValue]) -> EntryValues {
    EntryValues::new().with_list(
        "items",
        cells
            .iter()
            .map(|cell| row(&[("score", cell.clone())]))
            .collect(),
    )
}
