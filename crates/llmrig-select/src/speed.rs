//! Tokens-per-second estimation and speed scoring.
//!
//! The estimate starts from a backend coefficient divided by effective
//! parameter count, then applies the quantization multiplier, a threading
//! bonus, an accelerator bonus, and the MoE speedup. The score normalizes
//! the estimate to 0-100 against the per-category target.

use crate::category::TaskCategory;
use crate::moe::{moe_speed_multiplier, resolve_parameter_profile};
use crate::round1;
use llmrig_core::{Backend, HardwareProfile, ModelVariant, Quant, RuntimeKind};

/// Cores at and above which the threading bonus applies.
const THREADING_BONUS_CORES: u32 = 8;

/// Throughput coefficient for a resolved backend.
pub fn backend_coefficient(backend: Backend) -> f64 {
    match backend {
        Backend::Metal => 160.0,
        Backend::Cuda => 220.0,
        Backend::CpuArm => 90.0,
        Backend::CpuX86 => 70.0,
    }
}

/// Predict tokens/sec for a model at a quantization on this hardware.
pub fn estimate_tps(
    hardware: &HardwareProfile,
    variant: &ModelVariant,
    quant: Quant,
    runtime: RuntimeKind,
) -> f64 {
    let backend = hardware.backend();
    let profile = resolve_parameter_profile(variant);
    let params = profile.effective_params_b.max(0.1);

    let mut tps = backend_coefficient(backend) / params;
    tps *= quant.speed_multiplier();
    if hardware.cpu.physical_cores >= THREADING_BONUS_CORES {
        tps *= 1.1;
    }
    if backend.is_accelerated() {
        tps *= 1.2;
    }
    tps * moe_speed_multiplier(variant, runtime)
}

/// Normalize a throughput figure to a 0-100 score against the category
/// target.
pub fn speed_score(tps: f64, category: TaskCategory) -> f64 {
    let target = category.target_tps();
    round1(100.0 * tps / target).min(100.0)
}
