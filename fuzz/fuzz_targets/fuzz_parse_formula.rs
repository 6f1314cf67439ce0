#![no_main]

use libfuzzer_sys::fuzz_target;

use kpi_formula::{
    check_expression, classify, parse_with_config, CrossEntitySnapshot, EvaluatorConfig,
    FormulaError, GuardOutcome, Namespace,
};

/// Slightly above the default expression limit so the length check itself is exercised.
const MAX_FUZZ_FORMULA_CHARS: usize = 4_096 + 256;
const MAX_INPUT_BYTES: usize = MAX_FUZZ_FORMULA_CHARS * 4; // max UTF-8 bytes per char

fn truncate_to_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let data = &data[..data.len().min(MAX_INPUT_BYTES)];
    let input = String::from_utf8_lossy(data);
    let formula = truncate_to_chars(&input, MAX_FUZZ_FORMULA_CHARS);

    // Vary the parser limits so both deep and shallow nesting bounds get hit.
    let selector = data[0];
    let config = EvaluatorConfig {
        max_nesting_depth: 1 + usize::from(selector & 0x3f),
        case_insensitive_functions: selector & 0x40 == 0,
        ..EvaluatorConfig::default()
    };

    let _ = parse_with_config(formula, &config);

    // Whatever the parser would make of it, a guard rejection wins.
    let checked = check_expression(
        formula,
        &Namespace::new(),
        &CrossEntitySnapshot::new(),
        &config,
    );
    match classify(formula) {
        GuardOutcome::Rejected { offending } => {
            assert_eq!(checked, Err(FormulaError::SyntaxRejected(offending)));
        }
        GuardOutcome::Empty => assert_eq!(checked, Err(FormulaError::EmptyExpression)),
        GuardOutcome::Accepted => {}
    }
});
