//! Inference runtime kinds and the executor seam.
//!
//! The probe executor and calibration manager both drive a local inference
//! daemon through the [`RuntimeExecutor`] trait, keeping the engines free of
//! HTTP concerns and fully mockable in tests.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported inference runtimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeKind {
    Ollama,
    Vllm,
    Mlx,
    LlamaCpp,
}

impl RuntimeKind {
    /// Resolve a loose runtime name, accepting common aliases.
    pub fn resolve(name: &str) -> Option<RuntimeKind> {
        match name.trim().to_lowercase().as_str() {
            "ollama" => Some(RuntimeKind::Ollama),
            "vllm" => Some(RuntimeKind::Vllm),
            "mlx" | "mlx-lm" | "mlx_lm" => Some(RuntimeKind::Mlx),
            "llama.cpp" | "llamacpp" | "llama-cpp" | "llama_cpp" => Some(RuntimeKind::LlamaCpp),
            _ => None,
        }
    }

    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeKind::Ollama => "ollama",
            RuntimeKind::Vllm => "vllm",
            RuntimeKind::Mlx => "mlx",
            RuntimeKind::LlamaCpp => "llama.cpp",
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        RuntimeKind::resolve(s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("unknown runtime: {}", s)))
    }
}

/// Options for a single generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Cap on tokens to generate.
    pub num_predict: Option<u32>,
    /// Per-request timeout override in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// Result of one generation request against the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRun {
    pub output: String,
    /// Wall-clock latency in milliseconds.
    pub latency_ms: u64,
    /// Time to first token in milliseconds, when the runtime reports it.
    pub ttft_ms: Option<u64>,
    /// True generated-token count, when the runtime reports it.
    pub eval_count: Option<u64>,
    /// Generation duration the runtime attributes to those tokens, in
    /// milliseconds.
    pub eval_duration_ms: Option<u64>,
}

impl GenerationRun {
    /// Tokens generated: the runtime's true count when present, else a
    /// words-based estimate.
    pub fn token_count(&self, tokens_per_word: f64) -> f64 {
        match self.eval_count {
            Some(count) => count as f64,
            None => self.output.split_whitespace().count() as f64 * tokens_per_word,
        }
    }

    /// Tokens per second for this run: runtime-attributed timing when
    /// available, else wall-clock.
    pub fn tokens_per_second(&self, tokens_per_word: f64) -> f64 {
        let tokens = self.token_count(tokens_per_word);
        let duration_ms = match (self.eval_count, self.eval_duration_ms) {
            (Some(_), Some(eval_ms)) if eval_ms > 0 => eval_ms,
            _ => self.latency_ms,
        };
        if duration_ms == 0 {
            return 0.0;
        }
        tokens / (duration_ms as f64 / 1000.0)
    }
}

/// Executor seam for a local inference daemon.
#[async_trait]
pub trait RuntimeExecutor: Send + Sync {
    /// Run a single non-streaming generation.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationRun>;

    /// Which runtime this executor drives.
    fn kind(&self) -> RuntimeKind;
}
