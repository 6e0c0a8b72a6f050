//! Check evaluation against model output.

use crate::suite::{CheckType, PromptCheck};
use regex::Regex;

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub passed: bool,
    /// Diagnostic when the check itself could not be evaluated.
    pub detail: Option<String>,
}

/// Evaluate one check against the output.
///
/// A regex that does not compile is a failed check with a diagnostic, not
/// a fatal error; the model should not be punished less because the suite
/// author typoed a pattern, but the run must not abort either.
pub fn evaluate_check(check: &PromptCheck, output: &str) -> CheckOutcome {
    match check.check_type {
        CheckType::Exact => CheckOutcome {
            passed: output == check.expected,
            detail: None,
        },
        CheckType::Contains => CheckOutcome {
            passed: output.contains(&check.expected),
            detail: None,
        },
        CheckType::Regex => match Regex::new(&check.expected) {
            Ok(pattern) => CheckOutcome {
                passed: pattern.is_match(output),
                detail: None,
            },
            Err(e) => CheckOutcome {
                passed: false,
                detail: Some(format!("invalid regular expression: {}", e)),
            },
        },
    }
}

/// Weighted pass rate over the checks, clamped to [0, 1]. A prompt with no
/// checks counts as fully passing.
pub fn pass_rate(checks: &[PromptCheck], output: &str) -> f64 {
    if checks.is_empty() {
        return 1.0;
    }
    let mut total_weight = 0.0;
    let mut passed_weight = 0.0;
    for check in checks {
        total_weight += check.weight;
        if evaluate_check(check, output).passed {
            passed_weight += check.weight;
        }
    }
    if total_weight <= 0.0 {
        return 1.0;
    }
    (passed_weight / total_weight).clamp(0.0, 1.0)
}
