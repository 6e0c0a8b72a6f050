//! Mixture-of-experts parameter accounting and runtime speedup profiles.
//!
//! Both the memory and speed estimators consume the single
//! [`resolve_parameter_profile`] resolution so MoE handling cannot drift
//! between them. The `assumption_source` tag is retained in outputs for
//! traceability.

use llmrig_core::{ModelVariant, RuntimeKind};
use serde::{Deserialize, Serialize};

/// How the effective parameter count was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssumptionSource {
    DenseParams,
    MoeActiveMetadata,
    MoeDerivedExpertRatio,
    MoeFallbackTotalParams,
    MoeFallbackModelParams,
    MoeFallbackDefault,
}

/// Resolved parameter profile feeding the memory and speed estimators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterProfile {
    pub is_moe: bool,
    /// Parameters actually exercised per token, in billions.
    pub effective_params_b: f64,
    pub assumption_source: AssumptionSource,
}

impl ParameterProfile {
    /// Whether the sparse-inference memory path applies: only when real
    /// active-parameter metadata backed the resolution.
    pub fn sparse_inference(&self) -> bool {
        matches!(self.assumption_source, AssumptionSource::MoeActiveMetadata)
    }
}

/// Resolve the effective parameter count for a model.
///
/// Priority: dense pass-through, declared active params, expert-ratio
/// derivation, total-params fallback, model-params fallback, 1.0 default.
pub fn resolve_parameter_profile(variant: &ModelVariant) -> ParameterProfile {
    if !variant.is_moe {
        return ParameterProfile {
            is_moe: false,
            effective_params_b: variant.params_b,
            assumption_source: AssumptionSource::DenseParams,
        };
    }

    let moe = &variant.moe;

    if let Some(active) = moe.active_params_b {
        let consistent = moe.total_params_b.map_or(true, |total| active <= total);
        if active > 0.0 && consistent {
            return ParameterProfile {
                is_moe: true,
                effective_params_b: active,
                assumption_source: AssumptionSource::MoeActiveMetadata,
            };
        }
    }

    if let (Some(total), Some(experts), Some(active_experts)) = (
        moe.total_params_b,
        moe.expert_count,
        moe.experts_active_per_token,
    ) {
        if total > 0.0 && experts > 0 {
            let ratio = (active_experts as f64 / experts as f64).min(1.0);
            return ParameterProfile {
                is_moe: true,
                effective_params_b: total * ratio,
                assumption_source: AssumptionSource::MoeDerivedExpertRatio,
            };
        }
    }

    if let Some(total) = moe.total_params_b {
        if total > 0.0 {
            return ParameterProfile {
                is_moe: true,
                effective_params_b: total,
                assumption_source: AssumptionSource::MoeFallbackTotalParams,
            };
        }
    }

    if variant.params_b > 0.0 {
        return ParameterProfile {
            is_moe: true,
            effective_params_b: variant.params_b,
            assumption_source: AssumptionSource::MoeFallbackModelParams,
        };
    }

    ParameterProfile {
        is_moe: true,
        effective_params_b: 1.0,
        assumption_source: AssumptionSource::MoeFallbackDefault,
    }
}

/// Per-runtime MoE overhead profile. The overhead multiplier discounts the
/// theoretical sparse speedup for routing, expert communication, and
/// offloading costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuntimeMoeProfile {
    pub routing_discount: f64,
    pub communication_discount: f64,
    pub offload_discount: f64,
    /// Upper bound on the realized speedup.
    pub speedup_cap: f64,
}

impl RuntimeMoeProfile {
    /// Profile for a runtime. Aliases are resolved by [`RuntimeKind`]
    /// before this table is consulted.
    pub fn for_runtime(runtime: RuntimeKind) -> Self {
        match runtime {
            RuntimeKind::Ollama => Self {
                routing_discount: 0.18,
                communication_discount: 0.13,
                offload_discount: 0.08,
                speedup_cap: 2.35,
            },
            RuntimeKind::Vllm => Self {
                routing_discount: 0.12,
                communication_discount: 0.08,
                offload_discount: 0.04,
                speedup_cap: 2.65,
            },
            RuntimeKind::Mlx => Self {
                routing_discount: 0.16,
                communication_discount: 0.10,
                offload_discount: 0.05,
                speedup_cap: 2.45,
            },
            RuntimeKind::LlamaCpp => Self {
                routing_discount: 0.20,
                communication_discount: 0.14,
                offload_discount: 0.09,
                speedup_cap: 2.30,
            },
        }
    }

    /// Fraction of the theoretical speedup that survives the runtime's
    /// routing, communication, and offload costs.
    pub fn overhead_multiplier(&self) -> f64 {
        (1.0 - self.routing_discount)
            * (1.0 - self.communication_discount)
            * (1.0 - self.offload_discount)
    }
}

/// Realized throughput multiplier for a model on a runtime. Dense models
/// get 1.0; MoE models get the capped, overhead-discounted sparse speedup.
pub fn moe_speed_multiplier(variant: &ModelVariant, runtime: RuntimeKind) -> f64 {
    if !variant.is_moe {
        return 1.0;
    }

    let profile = resolve_parameter_profile(variant);
    let dense = variant
        .moe
        .total_params_b
        .filter(|total| *total > 0.0)
        .unwrap_or(variant.params_b);
    let active = profile.effective_params_b.max(0.001);

    let theoretical = (dense / active).clamp(1.0, 4.0);
    let runtime_profile = RuntimeMoeProfile::for_runtime(runtime);
    (theoretical * runtime_profile.overhead_multiplier()).clamp(1.0, runtime_profile.speedup_cap)
}
