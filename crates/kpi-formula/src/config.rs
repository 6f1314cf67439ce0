use serde::{Deserialize, Serialize};

/// Limits and matching rules applied to every formula evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Expressions longer than this many characters are rejected before parsing.
    pub max_expression_len: usize,
    /// Maximum nesting of parentheses, unary signs and calls accepted by the parser.
    pub max_nesting_depth: usize,
    /// When `true`, `sum_items(...)` resolves like `SUM_ITEMS(...)`.
    pub case_insensitive_functions: bool,
    /// When `true`, a final value of `inf`/`NaN` counts as an arithmetic fault.
    pub require_finite_results: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_expression_len: 4_096,
            max_nesting_depth: 64,
            case_insensitive_functions: true,
            require_finite_results: true,
        }
    }
}

impl EvaluatorConfig {
    /// Configuration that only matches upper-case function names.
    #[must_use]
    pub fn strict_function_names() -> Self {
        Self {
            case_insensitive_functions: false,
            ..Self::default()
        }
    }
}
