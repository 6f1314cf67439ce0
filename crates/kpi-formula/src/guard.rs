//! Character allow-list applied to formula text before anything else looks at it.

/// Result of screening a raw formula string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Empty or whitespace-only text: the field simply has no formula.
    Empty,
    /// At least one character outside the allow-list.
    Rejected { offending: char },
    Accepted,
}

/// Symbols allowed besides word characters and whitespace.
const ALLOWED_SYMBOLS: &[char] = &['+', '-', '*', '/', '(', ')', '.', ',', '"', '\''];

fn is_allowed(c: char) -> bool {
    // "Word" characters are Unicode-aware so field keys like `größe` survive the guard.
    c.is_alphanumeric() || c == '_' || c.is_whitespace() || ALLOWED_SYMBOLS.contains(&c)
}

/// Screen `expression`, reporting whether it is empty, rejected or accepted.
pub fn classify(expression: &str) -> GuardOutcome {
    if expression.trim().is_empty() {
        return GuardOutcome::Empty;
    }
    match expression.chars().find(|c| !is_allowed(*c)) {
        Some(offending) => GuardOutcome::Rejected { offending },
        None => GuardOutcome::Accepted,
    }
}

/// `true` when every character of `expression` is on the allow-list.
///
/// Empty text is not a guard failure; callers that care about the difference use [`classify`].
pub fn validate(expression: &str) -> bool {
    !matches!(classify(expression), GuardOutcome::Rejected { .. })
}
