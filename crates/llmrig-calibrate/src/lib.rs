//! # llmrig-calibrate
//!
//! Prompt-suite calibration and routing policy synthesis for llmrig.
//!
//! This crate provides:
//! - JSONL prompt-suite parsing with fatal, line-numbered diagnostics
//! - Check evaluation (exact / contains / regex) with weighted pass rates
//! - The calibration manager: warmup + measured iterations per model,
//!   latency percentile aggregation, per-model failure isolation
//! - Deterministic routing policy synthesis and the YAML policy artifact
//!
//! Dry-run and contract-only modes emit schema-valid artifacts without
//! ever touching the inference daemon.

pub mod aggregate;
pub mod checks;
pub mod manager;
pub mod policy;
pub mod result;
pub mod suite;

// Re-export core types alongside the calibration surface
pub use llmrig_core::{Error, HardwareProfile, Result, RuntimeExecutor, RuntimeKind};

pub use aggregate::{mean, median, nearest_rank_percentile};
pub use checks::{evaluate_check, pass_rate, CheckOutcome};
pub use manager::{calibrate, CalibrateOptions};
pub use policy::{
    synthesize_policy, CalibrationPolicy, PolicyMetadata, PolicySource, RouteEntry,
};
pub use result::{
    CalibrationHardware, CalibrationResult, CalibrationSummary, ExecutionMode, ModelCalibration,
    ModelMetrics, ModelQuality, ModelStatus, ModelTraces, Objective, PromptRunTrace, SuiteInfo,
};
pub use suite::{CheckType, PromptCheck, PromptSuite, SuitePrompt};
