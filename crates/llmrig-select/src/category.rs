//! Task categories and optimization objectives.

use llmrig_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Task category a selection is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    General,
    Coding,
    Reasoning,
    Summarization,
    Reading,
    Multimodal,
    Embeddings,
    Talking,
    Creative,
}

impl TaskCategory {
    /// The fixed set `recommend_per_category` iterates.
    pub const RECOMMENDED: [TaskCategory; 7] = [
        TaskCategory::Coding,
        TaskCategory::Reasoning,
        TaskCategory::Multimodal,
        TaskCategory::Creative,
        TaskCategory::Talking,
        TaskCategory::Reading,
        TaskCategory::General,
    ];

    /// Canonical token.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::General => "general",
            TaskCategory::Coding => "coding",
            TaskCategory::Reasoning => "reasoning",
            TaskCategory::Summarization => "summarization",
            TaskCategory::Reading => "reading",
            TaskCategory::Multimodal => "multimodal",
            TaskCategory::Embeddings => "embeddings",
            TaskCategory::Talking => "talking",
            TaskCategory::Creative => "creative",
        }
    }

    /// Human-readable description for the recommendation surface.
    pub fn description(&self) -> &'static str {
        match self {
            TaskCategory::General => "General chat and instruction following",
            TaskCategory::Coding => "Code generation and completion",
            TaskCategory::Reasoning => "Multi-step reasoning and analysis",
            TaskCategory::Summarization => "Document summarization",
            TaskCategory::Reading => "Long-document reading and extraction",
            TaskCategory::Multimodal => "Image understanding",
            TaskCategory::Embeddings => "Vector embeddings for search",
            TaskCategory::Talking => "Conversational back-and-forth",
            TaskCategory::Creative => "Creative writing",
        }
    }

    /// Target throughput the speed score is normalized against (tokens/sec).
    pub fn target_tps(&self) -> f64 {
        match self {
            TaskCategory::Reasoning => 25.0,
            TaskCategory::Summarization | TaskCategory::Reading => 60.0,
            TaskCategory::Embeddings => 200.0,
            _ => 40.0,
        }
    }

    /// Short prompt used by the probe executor for this category.
    pub fn probe_prompt(&self) -> &'static str {
        match self {
            TaskCategory::Coding => "Write a function that reverses a string.",
            TaskCategory::Reasoning => {
                "A train leaves at 3pm traveling 60km/h. How far has it gone by 5pm?"
            }
            TaskCategory::Summarization | TaskCategory::Reading => {
                "Summarize in one sentence: the quick brown fox jumps over the lazy dog."
            }
            TaskCategory::Multimodal => "Describe what a photograph of a sunset looks like.",
            TaskCategory::Embeddings => "hello world",
            _ => "Briefly introduce yourself in two sentences.",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(TaskCategory::General),
            "coding" | "code" => Ok(TaskCategory::Coding),
            "reasoning" => Ok(TaskCategory::Reasoning),
            "summarization" | "summarize" => Ok(TaskCategory::Summarization),
            "reading" => Ok(TaskCategory::Reading),
            "multimodal" | "vision" => Ok(TaskCategory::Multimodal),
            "embeddings" | "embedding" => Ok(TaskCategory::Embeddings),
            "talking" | "chat" => Ok(TaskCategory::Talking),
            "creative" => Ok(TaskCategory::Creative),
            other => Err(Error::InvalidInput(format!("unknown category: {}", other))),
        }
    }
}

/// Optimization objective blended into the category weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizeFor {
    Speed,
    Quality,
    Context,
    Coding,
    #[default]
    Balanced,
}

impl OptimizeFor {
    /// Canonical token.
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizeFor::Speed => "speed",
            OptimizeFor::Quality => "quality",
            OptimizeFor::Context => "context",
            OptimizeFor::Coding => "coding",
            OptimizeFor::Balanced => "balanced",
        }
    }
}

impl fmt::Display for OptimizeFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizeFor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "speed" => Ok(OptimizeFor::Speed),
            "quality" => Ok(OptimizeFor::Quality),
            "context" => Ok(OptimizeFor::Context),
            "coding" => Ok(OptimizeFor::Coding),
            "balanced" => Ok(OptimizeFor::Balanced),
            other => Err(Error::InvalidInput(format!(
                "unknown optimization profile: {}",
                other
            ))),
        }
    }
}
