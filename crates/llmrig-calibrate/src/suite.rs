//! Prompt suite parsing.
//!
//! A suite is a line-delimited JSON file, one prompt object per line:
//!
//! ```json
//! {"id": "math-1", "task": "reasoning", "prompt": "What is 2+2?",
//!  "checks": [{"type": "contains", "expected": "4"}]}
//! ```
//!
//! `prompt` is required and non-empty; `id` defaults to `prompt-{n}` (1-based),
//! `task` defaults to `general`. Invalid JSON or an invalid check shape is a
//! fatal parse error carrying the 1-based line number.

use llmrig_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Check type applied to a model's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    Exact,
    Contains,
    Regex,
}

/// One expectation about a prompt's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptCheck {
    #[serde(rename = "type")]
    pub check_type: CheckType,
    pub expected: String,
    /// Relative weight in the pass rate. Defaults to 1.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// One prompt in a suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuitePrompt {
    pub id: String,
    pub task: String,
    pub prompt: String,
    #[serde(default)]
    pub checks: Vec<PromptCheck>,
}

/// A parsed prompt suite.
#[derive(Debug, Clone)]
pub struct PromptSuite {
    /// Where the suite came from, for artifact headers.
    pub path: String,
    pub prompts: Vec<SuitePrompt>,
}

/// Raw line shape before defaults are applied.
#[derive(Deserialize)]
struct RawPrompt {
    prompt: String,
    id: Option<String>,
    task: Option<String>,
    #[serde(default)]
    checks: Vec<RawCheck>,
}

#[derive(Deserialize)]
struct RawCheck {
    #[serde(rename = "type")]
    check_type: String,
    expected: Option<String>,
    weight: Option<f64>,
}

impl PromptSuite {
    /// Parse suite content. `path` labels the source in artifacts and
    /// errors.
    pub fn parse_str(content: &str, path: impl Into<String>) -> Result<Self> {
        let mut prompts = Vec::new();

        for (line_index, line) in content.lines().enumerate() {
            let line_number = line_index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let raw: RawPrompt = serde_json::from_str(trimmed).map_err(|e| Error::Suite {
                line: line_number,
                message: e.to_string(),
            })?;

            if raw.prompt.trim().is_empty() {
                return Err(Error::Suite {
                    line: line_number,
                    message: "prompt must be non-empty".to_string(),
                });
            }

            let checks = raw
                .checks
                .into_iter()
                .map(|check| validate_check(check, line_number))
                .collect::<Result<Vec<_>>>()?;

            prompts.push(SuitePrompt {
                id: raw
                    .id
                    .unwrap_or_else(|| format!("prompt-{}", prompts.len() + 1)),
                task: raw.task.unwrap_or_else(|| "general".to_string()),
                prompt: raw.prompt,
                checks,
            });
        }

        Ok(Self {
            path: path.into(),
            prompts,
        })
    }

    /// Parse a suite file from disk.
    pub fn parse_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Artifact(format!("cannot read prompt suite {}: {}", path.display(), e))
        })?;
        Self::parse_str(&content, path.display().to_string())
    }

    /// Prompt count per task.
    pub fn task_breakdown(&self) -> BTreeMap<String, usize> {
        let mut breakdown = BTreeMap::new();
        for prompt in &self.prompts {
            *breakdown.entry(prompt.task.clone()).or_insert(0) += 1;
        }
        breakdown
    }

    /// Distinct tasks in suite order of first appearance.
    pub fn tasks(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for prompt in &self.prompts {
            if !seen.contains(&prompt.task) {
                seen.push(prompt.task.clone());
            }
        }
        seen
    }
}

fn validate_check(raw: RawCheck, line_number: usize) -> Result<PromptCheck> {
    let check_type = match raw.check_type.as_str() {
        "exact" => CheckType::Exact,
        "contains" => CheckType::Contains,
        "regex" => CheckType::Regex,
        other => {
            return Err(Error::Suite {
                line: line_number,
                message: format!("unknown check type: {}", other),
            })
        }
    };

    let expected = raw.expected.unwrap_or_default();
    if expected.is_empty() {
        return Err(Error::Suite {
            line: line_number,
            message: "check expected value must be non-empty".to_string(),
        });
    }

    let weight = raw.weight.unwrap_or(1.0);
    if weight <= 0.0 {
        return Err(Error::Suite {
            line: line_number,
            message: "check weight must be positive".to_string(),
        });
    }

    Ok(PromptCheck {
        check_type,
        expected,
        weight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_suite() {
        let content = r#"{"prompt": "What is 2+2?"}"#;
        let suite = PromptSuite::parse_str(content, "inline").unwrap();
        assert_eq!(suite.prompts.len(), 1);
        assert_eq!(suite.prompts[0].id, "prompt-1");
        assert_eq!(suite.prompts[0].task, "general");
        assert!(suite.prompts[0].checks.is_empty());
    }

    #[test]
    fn test_parse_full_prompt() {
        let content = r#"{"id": "math-1", "task": "reasoning", "prompt": "2+2?", "checks": [{"type": "contains", "expected": "4", "weight": 2.0}]}"#;
        let suite = PromptSuite::parse_str(content, "inline").unwrap();
        let prompt = &suite.prompts[0];
        assert_eq!(prompt.id, "math-1");
        assert_eq!(prompt.task, "reasoning");
        assert_eq!(prompt.checks.len(), 1);
        assert_eq!(prompt.checks[0].check_type, CheckType::Contains);
        assert_eq!(prompt.checks[0].weight, 2.0);
    }

    #[test]
    fn test_default_ids_are_ordinal() {
        let content = "{\"prompt\": \"a\"}\n{\"prompt\": \"b\"}\n{\"prompt\": \"c\"}";
        let suite = PromptSuite::parse_str(content, "inline").unwrap();
        let ids: Vec<&str> = suite.prompts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["prompt-1", "prompt-2", "prompt-3"]);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let content = "{\"prompt\": \"a\"}\n\n   \n{\"prompt\": \"b\"}";
        let suite = PromptSuite::parse_str(content, "inline").unwrap();
        assert_eq!(suite.prompts.len(), 2);
    }

    #[test]
    fn test_invalid_json_reports_line_number() {
        let content = "{\"prompt\": \"a\"}\n{not json}";
        let err = PromptSuite::parse_str(content, "inline").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{}", err);
    }

    #[test]
    fn test_empty_prompt_is_fatal() {
        let content = r#"{"prompt": "  "}"#;
        let err = PromptSuite::parse_str(content, "inline").unwrap_err();
        assert!(err.to_string().contains("non-empty"));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_unknown_check_type_is_fatal() {
        let content = r#"{"prompt": "a", "checks": [{"type": "fuzzy", "expected": "x"}]}"#;
        let err = PromptSuite::parse_str(content, "inline").unwrap_err();
        assert!(err.to_string().contains("unknown check type: fuzzy"));
    }

    #[test]
    fn test_empty_expected_is_fatal() {
        let content = r#"{"prompt": "a", "checks": [{"type": "exact", "expected": ""}]}"#;
        assert!(PromptSuite::parse_str(content, "inline").is_err());
    }

    #[test]
    fn test_non_positive_weight_is_fatal() {
        let content = r#"{"prompt": "a", "checks": [{"type": "exact", "expected": "x", "weight": 0}]}"#;
        assert!(PromptSuite::parse_str(content, "inline").is_err());
    }

    #[test]
    fn test_task_breakdown() {
        let content = concat!(
            "{\"prompt\": \"a\", \"task\": \"coding\"}\n",
            "{\"prompt\": \"b\", \"task\": \"coding\"}\n",
            "{\"prompt\": \"c\"}"
        );
        let suite = PromptSuite::parse_str(content, "inline").unwrap();
        let breakdown = suite.task_breakdown();
        assert_eq!(breakdown.get("coding"), Some(&2));
        assert_eq!(breakdown.get("general"), Some(&1));
        assert_eq!(suite.tasks(), vec!["coding".to_string(), "general".to_string()]);
    }

    #[test]
    fn test_parse_path_missing_file() {
        let err = PromptSuite::parse_path("/nonexistent/suite.jsonl").unwrap_err();
        assert!(err.to_string().contains("cannot read prompt suite"));
    }
}
