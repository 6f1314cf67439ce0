use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kpi_formula::{
    CellValue, CrossEntitySnapshot, EntryValues, FieldDef, FormulaDriver, ItemRow,
};

fn bench_rows() -> usize {
    std::env::var("KPI_FORMULA_BENCH_ROWS")
        .ok()
        .and_then(|v| v.replace('_', "").parse::<usize>().ok())
        .filter(|&v| (1..=1_000_000).contains(&v))
        .unwrap_or(10_000)
}

fn build_entity(rows: usize) -> (Vec<FieldDef>, EntryValues, CrossEntitySnapshot) {
    let items: Vec<ItemRow> = (0..rows)
        .map(|i| {
            ItemRow::from([
                ("amount".to_string(), CellValue::Number((i % 100) as f64)),
                ("status".to_string(), CellValue::Number((i % 3) as f64)),
                // Every tenth cell is text that has to go through coercion.
                (
                    "hours".to_string(),
                    if i % 10 == 0 {
                        CellValue::Text(format!("{}", i % 7))
                    } else {
                        CellValue::Number((i % 7) as f64)
                    },
                ),
            ])
        })
        .collect();

    let mut fields = vec![
        FieldDef::number("budget"),
        FieldDef::items("lines", vec!["amount", "status", "hours"]),
    ];
    for i in 0..20 {
        fields.push(FieldDef::formula(
            format!("open_{i}"),
            format!("SUM_ITEMS_WHERE(lines, amount, status, op_eq, {})", i % 3),
        ));
        fields.push(FieldDef::formula(
            format!("ratio_{i}"),
            format!("ROUND(open_{i} / budget * 100, 2) + AVG_ITEMS(lines, hours)"),
        ));
    }
    fields.push(FieldDef::formula(
        "peer",
        "KPI_FIELD(1, 'revenue') - COUNT_ITEMS(lines)",
    ));

    let values = EntryValues::new()
        .with_number("budget", 1_000_000.0)
        .with_list("lines", items);
    let snapshot = CrossEntitySnapshot::new().with_value(1, "revenue", 5.0);
    (fields, values, snapshot)
}

fn bench_driver(c: &mut Criterion) {
    let rows = bench_rows();
    let (fields, values, snapshot) = build_entity(rows);
    let driver = FormulaDriver::default();

    let mut group = c.benchmark_group("driver");
    group.throughput(Throughput::Elements(rows as u64));
    group.bench_with_input(BenchmarkId::new("evaluate", rows), &rows, |b, _| {
        b.iter(|| black_box(driver.evaluate(&fields, &values, &snapshot)))
    });
    group.finish();
}

criterion_group!(benches, bench_driver);
criterion_main!(benches);
