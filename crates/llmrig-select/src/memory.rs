//! Memory requirement estimation for a (model, quantization, context) pick.
//!
//! Strategy order: the MoE sparse-inference path (active params x
//! bytes-per-param) overrides everything, an observed artifact size beats
//! the heuristic, and the heuristic is params x bytes-per-param. KV cache
//! and a flat runtime overhead are added on top.

use crate::moe::resolve_parameter_profile;
use llmrig_core::{ModelVariant, Quant};

/// KV-cache coefficient: GB per (billion params x context token).
const KV_CACHE_COEFF: f64 = 8e-6;

/// Flat runtime overhead when the weight size was observed (GB).
const OVERHEAD_OBSERVED_GB: f64 = 0.35;

/// Flat runtime overhead when the weight size was estimated (GB).
const OVERHEAD_ESTIMATED_GB: f64 = 0.5;

/// Observed artifact size for this quant, when the pool knows one.
fn observed_size_gb(variant: &ModelVariant, quant: Quant) -> Option<f64> {
    if let Some(size) = variant.size_by_quant.get(&quant) {
        return Some(*size);
    }
    match (variant.quant, variant.size_gb) {
        (Some(own), Some(size)) if own == quant => Some(size),
        _ => None,
    }
}

/// Predict the memory required to run `variant` at `quant` with a
/// `ctx_tokens` context window, in GB.
pub fn required_gb(variant: &ModelVariant, quant: Quant, ctx_tokens: u32) -> f64 {
    let profile = resolve_parameter_profile(variant);

    let (model_mem_gb, observed) = if profile.sparse_inference() {
        // Sparse inference loads only the active experts; this deliberately
        // overrides the full-artifact size.
        (profile.effective_params_b * quant.bytes_per_param(), false)
    } else if let Some(size) = observed_size_gb(variant, quant) {
        (size, true)
    } else {
        (variant.params_b * quant.bytes_per_param(), false)
    };

    let kv_cache_gb = KV_CACHE_COEFF * variant.params_b * ctx_tokens as f64;
    let overhead_gb = if observed {
        OVERHEAD_OBSERVED_GB
    } else {
        OVERHEAD_ESTIMATED_GB
    };

    model_mem_gb + kv_cache_gb + overhead_gb
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmrig_core::MoeMetadata;

    #[test]
    fn test_heuristic_path() {
        let variant = ModelVariant::new("qwen2.5:7b", 7.6, 32_768);
        let required = required_gb(&variant, Quant::Q4_K_M, 4096);
        // 7.6 * 0.58 + 8e-6 * 7.6 * 4096 + 0.5
        let expected = 7.6 * 0.58 + 8e-6 * 7.6 * 4096.0 + 0.5;
        assert!((required - expected).abs() < 1e-9);
    }

    #[test]
    fn test_observed_size_from_sibling_map() {
        let mut variant = ModelVariant::new("qwen2.5:7b", 7.6, 32_768);
        variant.size_by_quant.insert(Quant::Q4_K_M, 4.7);
        let required = required_gb(&variant, Quant::Q4_K_M, 4096);
        let expected = 4.7 + 8e-6 * 7.6 * 4096.0 + 0.35;
        assert!((required - expected).abs() < 1e-9);
    }

    #[test]
    fn test_observed_size_from_own_artifact() {
        let mut variant = ModelVariant::new("qwen2.5:7b-q5_K_M", 7.6, 32_768);
        variant.quant = Some(Quant::Q5_K_M);
        variant.size_gb = Some(5.4);
        let required = required_gb(&variant, Quant::Q5_K_M, 4096);
        let expected = 5.4 + 8e-6 * 7.6 * 4096.0 + 0.35;
        assert!((required - expected).abs() < 1e-9);
    }

    #[test]
    fn test_own_artifact_ignored_for_other_quants() {
        let mut variant = ModelVariant::new("qwen2.5:7b-q5_K_M", 7.6, 32_768);
        variant.quant = Some(Quant::Q5_K_M);
        variant.size_gb = Some(5.4);
        let required = required_gb(&variant, Quant::Q2_K, 4096);
        let expected = 7.6 * 0.37 + 8e-6 * 7.6 * 4096.0 + 0.5;
        assert!((required - expected).abs() < 1e-9);
    }

    #[test]
    fn test_moe_sparse_path_overrides_artifact() {
        let mut variant = ModelVariant::new("mixtral:8x7b", 46.7, 32_768);
        variant.is_moe = true;
        variant.moe = MoeMetadata {
            total_params_b: Some(46.7),
            active_params_b: Some(12.9),
            expert_count: Some(8),
            experts_active_per_token: Some(2),
        };
        variant.size_by_quant.insert(Quant::Q4_K_M, 26.4);

        let required = required_gb(&variant, Quant::Q4_K_M, 4096);
        let expected = 12.9 * 0.58 + 8e-6 * 46.7 * 4096.0 + 0.5;
        assert!((required - expected).abs() < 1e-9);
    }

    #[test]
    fn test_moe_beats_dense_equivalent() {
        let mut moe = ModelVariant::new("mixtral:8x7b", 46.7, 32_768);
        moe.is_moe = true;
        moe.moe.total_params_b = Some(46.7);
        moe.moe.active_params_b = Some(12.9);

        let dense = ModelVariant::new("dense:47b", 46.7, 32_768);

        let moe_required = required_gb(&moe, Quant::Q4_K_M, 4096);
        let dense_required = required_gb(&dense, Quant::Q4_K_M, 4096);
        assert!(moe_required < dense_required);
    }

    #[test]
    fn test_kv_cache_grows_with_context() {
        let variant = ModelVariant::new("llama3.1:8b", 8.0, 131_072);
        let small = required_gb(&variant, Quant::Q4_K_M, 4096);
        let large = required_gb(&variant, Quant::Q4_K_M, 32_768);
        assert!(large > small);
        let delta = large - small;
        let expected_delta = 8e-6 * 8.0 * (32_768.0 - 4096.0);
        assert!((delta - expected_delta).abs() < 1e-9);
    }

    #[test]
    fn test_lower_quant_needs_less_memory() {
        let variant = ModelVariant::new("llama3.1:70b", 70.6, 131_072);
        let q8 = required_gb(&variant, Quant::Q8_0, 4096);
        let q4 = required_gb(&variant, Quant::Q4_K_M, 4096);
        let q2 = required_gb(&variant, Quant::Q2_K, 4096);
        assert!(q8 > q4);
        assert!(q4 > q2);
    }
}
