//! # llmrig-select
//!
//! Scoring engine and candidate pipeline for llmrig.
//!
//! This crate provides:
//! - Model pool normalization (installed inventory + catalog merge)
//! - MoE-aware parameter accounting shared by both estimators
//! - Memory and speed estimation
//! - The Q/S/F/C scoring engine with optimization-profile blending
//! - The candidate pipeline with mid-tier coverage enforcement
//! - Per-category recommendations and the machine summary
//!
//! Everything here is pure and synchronous; probing and calibration live in
//! their own crates.

pub mod category;
pub mod memory;
pub mod moe;
pub mod pipeline;
pub mod pool;
pub mod recommend;
pub mod scoring;
pub mod speed;

// Re-export core types alongside the engine surface
pub use llmrig_core::{
    Candidate, Components, Error, HardwareProfile, HardwareTier, ModelVariant, Quant, Result,
    RuntimeKind,
};

pub use category::{OptimizeFor, TaskCategory};
pub use memory::required_gb;
pub use moe::{
    moe_speed_multiplier, resolve_parameter_profile, AssumptionSource, ParameterProfile,
    RuntimeMoeProfile,
};
pub use pipeline::{
    category_filter, choose_quant, sort_candidates, HardwareSummary, SelectOptions,
    SelectionReport, Selector,
};
pub use pool::{infer_family, load_pool, parse_params_b};
pub use recommend::{
    recommend_per_category, summarize, CategoryInfo, CategoryRecommendation, RecommendOptions,
    Summary,
};
pub use scoring::{context_score, fit_score, quality_prior, Weights};
pub use speed::{backend_coefficient, estimate_tps, speed_score};

/// Round to one decimal place, the precision all emitted scores use.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
