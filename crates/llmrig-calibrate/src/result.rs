//! Calibration result schema.
//!
//! The emitted artifact is schema-versioned JSON. Field names are
//! snake_case on the wire; the summary invariant
//! `total = successful + failed + skipped + pending` holds for every
//! emitted record.

use chrono::{DateTime, Utc};
use llmrig_core::{Error, Result, RuntimeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Calibration execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    #[serde(rename = "dry-run")]
    DryRun,
    #[serde(rename = "contract-only")]
    ContractOnly,
    #[serde(rename = "full")]
    Full,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            ExecutionMode::DryRun => "dry-run",
            ExecutionMode::ContractOnly => "contract-only",
            ExecutionMode::Full => "full",
        };
        f.write_str(token)
    }
}

impl FromStr for ExecutionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dry-run" | "dryrun" => Ok(ExecutionMode::DryRun),
            "contract-only" | "contract" => Ok(ExecutionMode::ContractOnly),
            "full" => Ok(ExecutionMode::Full),
            other => Err(Error::InvalidMode(other.to_string())),
        }
    }
}

/// Optimization objective for calibration and policy synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Speed,
    Quality,
    #[default]
    Balanced,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Objective::Speed => "speed",
            Objective::Quality => "quality",
            Objective::Balanced => "balanced",
        };
        f.write_str(token)
    }
}

impl FromStr for Objective {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "speed" => Ok(Objective::Speed),
            "quality" => Ok(Objective::Quality),
            "balanced" => Ok(Objective::Balanced),
            other => Err(Error::InvalidInput(format!("unknown objective: {}", other))),
        }
    }
}

/// Per-model calibration status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Success,
    Failed,
    Skipped,
    Pending,
}

/// Aggregated performance metrics for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub ttft_ms: f64,
    pub tokens_per_second: f64,
    pub latency_ms_p50: f64,
    pub latency_ms_p95: f64,
    /// Peak memory, when the runtime reports it; 0 otherwise.
    #[serde(default)]
    pub peak_memory_mb: f64,
}

/// Aggregated quality for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelQuality {
    /// Mean across task scores, in [0, 100].
    pub overall_score: f64,
    /// Per-task scores, in [0, 100].
    pub task_scores: BTreeMap<String, f64>,
    /// Mean weighted check pass rate, in [0, 1].
    pub check_pass_rate: f64,
}

/// One measured (prompt, iteration) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRunTrace {
    pub prompt_id: String,
    pub iteration: u32,
    pub latency_ms: u64,
    pub ttft_ms: Option<u64>,
    pub output_tokens: f64,
    pub pass_rate: f64,
}

/// Execution trace for one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelTraces {
    pub warmup_runs: u32,
    pub measured_iterations: u32,
    #[serde(default)]
    pub prompt_runs: Vec<PromptRunTrace>,
    pub error_code: Option<String>,
}

/// Calibration record for one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCalibration {
    pub model_identifier: String,
    pub status: ModelStatus,
    pub metrics: Option<ModelMetrics>,
    pub quality: Option<ModelQuality>,
    #[serde(default)]
    pub traces: ModelTraces,
    pub error: Option<String>,
}

/// Hardware header in a calibration artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationHardware {
    pub fingerprint: String,
    pub description: String,
}

/// Suite header in a calibration artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteInfo {
    pub path: String,
    pub total_prompts: usize,
    pub task_breakdown: BTreeMap<String, usize>,
}

/// Status totals. `total` always equals the sum of the four buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pending: usize,
}

impl CalibrationSummary {
    /// Count statuses over the model records.
    pub fn from_models(models: &[ModelCalibration]) -> Self {
        let mut summary = Self {
            total: models.len(),
            successful: 0,
            failed: 0,
            skipped: 0,
            pending: 0,
        };
        for model in models {
            match model.status {
                ModelStatus::Success => summary.successful += 1,
                ModelStatus::Failed => summary.failed += 1,
                ModelStatus::Skipped => summary.skipped += 1,
                ModelStatus::Pending => summary.pending += 1,
            }
        }
        summary
    }

    /// The schema invariant.
    pub fn is_consistent(&self) -> bool {
        self.total == self.successful + self.failed + self.skipped + self.pending
    }
}

/// Schema-versioned calibration result artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub calibration_version: String,
    pub execution_mode: ExecutionMode,
    pub runtime: RuntimeKind,
    pub objective: Objective,
    pub hardware: CalibrationHardware,
    pub suite: SuiteInfo,
    pub models: Vec<ModelCalibration>,
    pub summary: CalibrationSummary,
}

impl CalibrationResult {
    /// Validate the structural invariants of the artifact.
    pub fn validate(&self) -> Result<()> {
        if self.schema_version != llmrig_core::defaults::SCHEMA_VERSION {
            return Err(Error::InvalidInput(format!(
                "unsupported calibration schema version: {}",
                self.schema_version
            )));
        }
        if !self.summary.is_consistent() {
            return Err(Error::InvalidInput(
                "calibration summary totals are inconsistent".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the artifact to disk. Refuses directories.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.is_dir() {
            return Err(Error::Artifact(format!(
                "output path is a directory: {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json()?)
            .map_err(|e| Error::Artifact(format!("cannot write {}: {}", path.display(), e)))
    }
}
