//! Component scoring and weight blending.
//!
//! Four components, each in [0, 100]:
//!
//! - **Q** - quality prior from parameter count, family, quantization,
//!   freshness, and task alignment
//! - **S** - speed score (see [`crate::speed`])
//! - **F** - memory fit comfort
//! - **C** - context adequacy
//!
//! Category base weights blend linearly with the optimization profile's
//! weights; profiles compose by blending, not inheritance.

use crate::category::{OptimizeFor, TaskCategory};
use crate::round1;
use llmrig_core::{Components, ModelVariant, Quant};

/// Weights over the (Q, S, F, C) components. Each row sums to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub q: f64,
    pub s: f64,
    pub f: f64,
    pub c: f64,
}

impl Weights {
    /// Base weights for a task category.
    pub fn for_category(category: TaskCategory) -> Self {
        match category {
            TaskCategory::Coding => Weights { q: 0.55, s: 0.20, f: 0.15, c: 0.10 },
            TaskCategory::Reasoning => Weights { q: 0.60, s: 0.10, f: 0.20, c: 0.10 },
            TaskCategory::Multimodal => Weights { q: 0.50, s: 0.15, f: 0.20, c: 0.15 },
            TaskCategory::Summarization | TaskCategory::Reading => {
                Weights { q: 0.40, s: 0.35, f: 0.15, c: 0.10 }
            }
            TaskCategory::Embeddings => Weights { q: 0.30, s: 0.50, f: 0.20, c: 0.00 },
            _ => Weights { q: 0.45, s: 0.35, f: 0.15, c: 0.05 },
        }
    }

    /// Override weights an optimization profile pulls toward, with the
    /// blend strength `p`. Balanced applies no override.
    fn profile_override(optimize_for: OptimizeFor) -> Option<(Weights, f64)> {
        match optimize_for {
            OptimizeFor::Speed => Some((Weights { q: 0.25, s: 0.55, f: 0.15, c: 0.05 }, 0.80)),
            OptimizeFor::Quality => Some((Weights { q: 0.65, s: 0.10, f: 0.15, c: 0.10 }, 0.95)),
            OptimizeFor::Context => Some((Weights { q: 0.30, s: 0.10, f: 0.20, c: 0.40 }, 0.85)),
            OptimizeFor::Coding => Some((Weights { q: 0.55, s: 0.25, f: 0.10, c: 0.10 }, 0.80)),
            OptimizeFor::Balanced => None,
        }
    }

    /// Blend category base weights with the optimization profile:
    /// `base * (1 - p) + profile * p`.
    pub fn blended(category: TaskCategory, optimize_for: OptimizeFor) -> Self {
        let base = Self::for_category(category);
        match Self::profile_override(optimize_for) {
            None => base,
            Some((profile, p)) => Weights {
                q: base.q * (1.0 - p) + profile.q * p,
                s: base.s * (1.0 - p) + profile.s * p,
                f: base.f * (1.0 - p) + profile.f * p,
                c: base.c * (1.0 - p) + profile.c * p,
            },
        }
    }

    /// Weighted sum of the components, rounded to one decimal.
    pub fn combine(&self, components: &Components) -> f64 {
        round1(
            self.q * components.q
                + self.s * components.s
                + self.f * components.f
                + self.c * components.c,
        )
    }
}

/// Base quality prior from the parameter-count bracket. In-gap sizes
/// inherit the floor of the bracket below them, keeping the prior
/// monotone in parameter count.
fn param_prior(params_b: f64) -> f64 {
    if params_b >= 70.0 {
        95.0
    } else if params_b >= 30.0 {
        89.0
    } else if params_b >= 13.0 {
        82.0
    } else if params_b >= 7.0 {
        75.0
    } else if params_b >= 2.0 {
        60.0
    } else {
        45.0
    }
}

/// Additive quality bump for recognized families.
fn family_bump(family: &str) -> f64 {
    match family {
        "qwen3" => 6.0,
        "qwen2.5" => 5.0,
        "deepseek" => 5.0,
        "llama3.2" => 4.0,
        "llama3.1" => 4.0,
        "mistral" => 3.0,
        "gemma2" => 3.0,
        "phi-3" => 3.0,
        "starcoder" => 3.0,
        "llava" => 2.0,
        "granite" => 2.0,
        "solar" => 2.0,
        "minicpm" => 1.0,
        _ => 0.0,
    }
}

/// Whether the variant reads as code-tuned.
fn is_coder(variant: &ModelVariant) -> bool {
    variant.has_tag("coder")
        || variant.has_tag("code")
        || variant.name.to_lowercase().contains("code")
}

/// Quality prior for a candidate, clamped to [0, 100].
pub fn quality_prior(variant: &ModelVariant, quant: Quant, category: TaskCategory) -> f64 {
    let mut q = param_prior(variant.params_b);

    q += family_bump(&variant.family);
    q += quant.quality_penalty();
    q += variant.freshness.quality_adjustment();

    // Task alignment
    match category {
        TaskCategory::Coding => {
            if is_coder(variant) {
                q += 6.0;
            }
            if !is_coder(variant) && !variant.has_tag("instruct") {
                q -= 15.0;
            }
        }
        TaskCategory::General => {
            if variant.has_tag("chat") || variant.has_tag("instruct") {
                q += 4.0;
            }
        }
        TaskCategory::Multimodal => {
            if variant.has_vision() {
                q += 6.0;
            }
        }
        TaskCategory::Reasoning => {
            if variant.params_b >= 13.0 {
                q += 5.0;
            }
        }
        _ => {}
    }

    q.clamp(0.0, 100.0)
}

/// Fit score: how comfortably the pick sits inside the budget. `None`
/// means the candidate is excluded.
pub fn fit_score(required_gb: f64, budget_gb: f64) -> Option<f64> {
    if budget_gb <= 0.0 {
        return None;
    }
    let ratio = required_gb / budget_gb;
    if ratio <= 0.9 {
        Some(100.0)
    } else if ratio <= 1.0 {
        Some(70.0)
    } else {
        None
    }
}

/// Context adequacy score against the target window. `None` means the
/// candidate is excluded (the pipeline gets one halving retry during quant
/// selection before giving up).
pub fn context_score(ctx_max: u32, target_ctx: u32) -> Option<f64> {
    if ctx_max >= target_ctx {
        Some(100.0)
    } else if ctx_max >= target_ctx / 2 {
        Some(70.0)
    } else {
        None
    }
}
