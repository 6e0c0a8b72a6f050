//! Hardware profile normalization, tier mapping, and fingerprinting.
//!
//! Hardware descriptors arrive from heterogeneous collaborators (OS probes,
//! config files, test fixtures) with inconsistent field names. This module
//! canonicalizes them into a single [`HardwareProfile`] shape that every
//! internal function consumes. Normalization never fails; missing fields get
//! safe defaults (4 cores, 8 GB RAM).
//!
//! # Hardware Tiers
//!
//! | Tier | Accelerator memory | Example hosts |
//! |-----------|--------------------|----------------------------------|
//! | low       | <8GB               | Older laptops, integrated GPUs   |
//! | medium    | 8-16GB             | RTX 4070, M1/M2 base             |
//! | high      | 16-32GB            | RTX 3090/4090, M2/M3 Pro         |
//! | very_high | 32-64GB            | M3/M4 Max, A5000                 |
//! | extreme   | 64GB+              | M2/M3 Ultra, A6000, multi-GPU    |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// CPU architecture classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuArch {
    Arm64,
    X86_64,
    AppleSilicon,
}

impl CpuArch {
    /// Canonical token used in fingerprints.
    pub fn as_str(&self) -> &'static str {
        match self {
            CpuArch::Arm64 => "arm64",
            CpuArch::X86_64 => "x86_64",
            CpuArch::AppleSilicon => "apple_silicon",
        }
    }

    /// Whether this is an ARM-family core (NEON-capable).
    pub fn is_arm(&self) -> bool {
        matches!(self, CpuArch::Arm64 | CpuArch::AppleSilicon)
    }
}

impl fmt::Display for CpuArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GPU vendor/type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuType {
    AppleSilicon,
    Nvidia,
    Amd,
    Intel,
    CpuOnly,
}

impl GpuType {
    /// Canonical token used in fingerprints.
    pub fn as_str(&self) -> &'static str {
        match self {
            GpuType::AppleSilicon => "apple_silicon",
            GpuType::Nvidia => "nvidia",
            GpuType::Amd => "amd",
            GpuType::Intel => "intel",
            GpuType::CpuOnly => "cpu_only",
        }
    }
}

impl fmt::Display for GpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accelerator execution path, resolved metal > cuda > cpu_arm > cpu_x86.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Metal,
    Cuda,
    CpuArm,
    CpuX86,
}

impl Backend {
    /// Human-readable label used in candidate rationale clauses.
    pub fn label(&self) -> &'static str {
        match self {
            Backend::Metal => "Metal",
            Backend::Cuda => "CUDA",
            Backend::CpuArm => "ARM CPU",
            Backend::CpuX86 => "x86 CPU",
        }
    }

    /// Whether this backend runs on a GPU.
    pub fn is_accelerated(&self) -> bool {
        matches!(self, Backend::Metal | Backend::Cuda)
    }
}

/// Normalized CPU description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuInfo {
    pub arch: CpuArch,
    pub physical_cores: u32,
    pub threads: u32,
    pub brand: String,
    pub peak_clock_ghz: f64,
    pub avx2: bool,
    pub avx512: bool,
    pub neon: bool,
}

/// Normalized memory description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryInfo {
    /// Total installed RAM in GB.
    pub total_gb: f64,
}

/// Normalized GPU description. Multi-GPU hosts aggregate VRAM here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuInfo {
    #[serde(rename = "type")]
    pub gpu_type: GpuType,
    pub model: String,
    pub vendor: String,
    /// Aggregated VRAM across all GPUs in GB. 0 for unified-memory hosts
    /// that do not report a dedicated figure.
    pub vram_gb: f64,
    /// VRAM of a single GPU in GB.
    pub vram_per_gpu_gb: f64,
    pub gpu_count: u32,
    pub unified: bool,
    pub is_multi_gpu: bool,
    /// Raw per-GPU model strings when the descriptor enumerated them.
    pub inventory: Vec<String>,
}

/// Acceleration capability flags.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Acceleration {
    pub supports_metal: bool,
    pub supports_cuda: bool,
    pub supports_rocm: bool,
}

/// Hardware tier classification for the summary surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareTier {
    Low,
    Medium,
    High,
    VeryHigh,
    Extreme,
}

impl HardwareTier {
    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            HardwareTier::Low => "Low (<8GB accelerator memory)",
            HardwareTier::Medium => "Medium (8-16GB accelerator memory)",
            HardwareTier::High => "High (16-32GB accelerator memory)",
            HardwareTier::VeryHigh => "Very high (32-64GB accelerator memory)",
            HardwareTier::Extreme => "Extreme (64GB+ accelerator memory)",
        }
    }

    /// Example hosts in this tier.
    pub fn example_hosts(&self) -> &'static [&'static str] {
        match self {
            HardwareTier::Low => &["GTX 1660", "Integrated graphics", "8GB laptops"],
            HardwareTier::Medium => &["RTX 4070", "M1", "M2"],
            HardwareTier::High => &["RTX 3090", "RTX 4090", "M2 Pro", "M3 Pro"],
            HardwareTier::VeryHigh => &["A5000", "M3 Max", "M4 Max"],
            HardwareTier::Extreme => &["A6000", "M2 Ultra", "Multi-GPU rigs"],
        }
    }
}

impl fmt::Display for HardwareTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            HardwareTier::Low => "low",
            HardwareTier::Medium => "medium",
            HardwareTier::High => "high",
            HardwareTier::VeryHigh => "very_high",
            HardwareTier::Extreme => "extreme",
        };
        f.write_str(token)
    }
}

/// Canonical hardware description consumed by every estimator and scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareProfile {
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub gpu: GpuInfo,
    pub acceleration: Acceleration,
    /// RAM the selector treats as usable after OS headroom.
    pub usable_mem_gb: f64,
}

impl HardwareProfile {
    /// Canonicalize a loose hardware descriptor.
    ///
    /// Accepts heterogeneous field names (`memory.total`, `memory.totalGB`,
    /// `total_ram_gb`, `gpu.vram`, `gpu.vramGB`, `gpu.totalVRAM`, per-GPU
    /// entry lists) and never fails: absent fields get safe defaults
    /// (4 cores, 8 GB RAM, cpu_only GPU).
    pub fn normalize(raw: &Value) -> Self {
        let cpu_raw = raw.get("cpu").cloned().unwrap_or(Value::Null);
        let gpu_raw = raw.get("gpu").cloned().unwrap_or(Value::Null);

        let total_gb = first_f64(
            &[
                raw.pointer("/memory/totalGB"),
                raw.pointer("/memory/total_gb"),
                raw.pointer("/memory/total"),
                raw.get("total_ram_gb"),
                raw.get("totalRamGB"),
            ],
        )
        .filter(|v| *v > 0.0)
        .unwrap_or(8.0);

        let brand = first_str(&[cpu_raw.get("brand"), cpu_raw.get("model"), cpu_raw.get("name")])
            .unwrap_or_default();

        let gpu_model = first_str(&[gpu_raw.get("model"), gpu_raw.get("name")]).unwrap_or_default();

        let unified = gpu_raw
            .get("unified")
            .and_then(Value::as_bool)
            .unwrap_or_else(|| looks_unified(&gpu_model) || looks_unified(&brand));

        let arch = parse_arch(&cpu_raw, &brand, unified);

        let physical_cores = first_f64(&[
            cpu_raw.get("physical_cores"),
            cpu_raw.get("physicalCores"),
            cpu_raw.get("cores"),
        ])
        .map(|v| v as u32)
        .filter(|v| *v > 0)
        .unwrap_or(4);

        let threads = first_f64(&[cpu_raw.get("threads"), cpu_raw.get("logical_cores")])
            .map(|v| v as u32)
            .filter(|v| *v > 0)
            .unwrap_or(physical_cores);

        let peak_clock_ghz = first_f64(&[
            cpu_raw.get("peak_clock_ghz"),
            cpu_raw.get("peakClockGHz"),
            cpu_raw.get("clock_ghz"),
        ])
        .unwrap_or(0.0);

        let inventory = per_gpu_entries(&gpu_raw);

        let gpu_count = first_f64(&[gpu_raw.get("gpuCount"), gpu_raw.get("gpu_count"), gpu_raw.get("count")])
            .map(|v| v as u32)
            .filter(|v| *v > 0)
            .unwrap_or_else(|| inventory.len().max(1) as u32);

        let per_gpu_sum: f64 = inventory.iter().map(|(_, vram)| vram).sum();

        let vram_per_gpu = first_f64(&[gpu_raw.get("vramPerGPU"), gpu_raw.get("vram_per_gpu_gb")])
            .unwrap_or(0.0);

        let scalar_vram =
            first_f64(&[gpu_raw.get("vramGB"), gpu_raw.get("vram_gb"), gpu_raw.get("vram")])
                .unwrap_or(0.0);

        // VRAM priority: explicit total > per-GPU entry sum > scalar figure
        // > per-GPU figure x count. A scalar figure on a multi-GPU host is
        // treated as per-GPU and multiplied.
        let vram_gb = if let Some(total) = first_f64(&[
            gpu_raw.get("totalVRAM"),
            gpu_raw.get("totalVram"),
            gpu_raw.get("total_vram_gb"),
        ]) {
            total
        } else if per_gpu_sum > 0.0 {
            per_gpu_sum
        } else if scalar_vram > 0.0 {
            if gpu_count > 1 {
                scalar_vram * gpu_count as f64
            } else {
                scalar_vram
            }
        } else {
            vram_per_gpu * gpu_count as f64
        };

        let gpu_type = parse_gpu_type(&gpu_raw, &gpu_model, unified, vram_gb);

        let vendor = first_str(&[gpu_raw.get("vendor")]).unwrap_or_else(|| {
            match gpu_type {
                GpuType::AppleSilicon => "Apple".to_string(),
                GpuType::Nvidia => "NVIDIA".to_string(),
                GpuType::Amd => "AMD".to_string(),
                GpuType::Intel => "Intel".to_string(),
                GpuType::CpuOnly => String::new(),
            }
        });

        let accel_raw = raw.get("acceleration").cloned().unwrap_or(Value::Null);
        let mut acceleration = Acceleration {
            supports_metal: accel_raw
                .get("supports_metal")
                .and_then(Value::as_bool)
                .unwrap_or(gpu_type == GpuType::AppleSilicon),
            supports_cuda: accel_raw
                .get("supports_cuda")
                .and_then(Value::as_bool)
                .unwrap_or(gpu_type == GpuType::Nvidia),
            supports_rocm: accel_raw
                .get("supports_rocm")
                .and_then(Value::as_bool)
                .unwrap_or(gpu_type == GpuType::Amd),
        };
        // unified memory implies a Metal path unless the host is an NVIDIA
        // unified-memory part
        if unified && gpu_type != GpuType::Nvidia {
            acceleration.supports_metal = true;
        }

        let (utilization, headroom) = if unified { (0.85, 1.5) } else { (0.8, 2.0) };
        let usable_mem_gb = (utilization * total_gb).min(total_gb - headroom).max(1.0);

        let vram_per_gpu_gb = if vram_per_gpu > 0.0 {
            vram_per_gpu
        } else if gpu_count > 0 {
            vram_gb / gpu_count as f64
        } else {
            vram_gb
        };

        Self {
            cpu: CpuInfo {
                arch,
                physical_cores,
                threads,
                brand,
                peak_clock_ghz,
                avx2: cpu_flag(&cpu_raw, "avx2", arch == CpuArch::X86_64),
                avx512: cpu_flag(&cpu_raw, "avx512", false),
                neon: cpu_flag(&cpu_raw, "neon", arch.is_arm()),
            },
            memory: MemoryInfo { total_gb },
            gpu: GpuInfo {
                gpu_type,
                model: gpu_model,
                vendor,
                vram_gb,
                vram_per_gpu_gb,
                gpu_count,
                unified,
                is_multi_gpu: gpu_count > 1,
                inventory: inventory.into_iter().map(|(name, _)| name).collect(),
            },
            acceleration,
            usable_mem_gb,
        }
    }

    /// Memory the selector is willing to commit to a single model:
    /// VRAM for dedicated GPUs, unified memory for Apple/unified hosts,
    /// usable RAM otherwise.
    pub fn budget_gb(&self) -> f64 {
        if self.gpu.unified {
            if self.gpu.vram_gb > 0.0 {
                self.gpu.vram_gb
            } else {
                self.usable_mem_gb
            }
        } else if self.gpu.vram_gb > 0.0 {
            self.gpu.vram_gb
        } else {
            self.usable_mem_gb
        }
    }

    /// Resolve the accelerator execution path, metal > cuda > cpu_arm >
    /// cpu_x86.
    pub fn backend(&self) -> Backend {
        if self.acceleration.supports_metal {
            Backend::Metal
        } else if self.acceleration.supports_cuda {
            Backend::Cuda
        } else if self.cpu.arch.is_arm() {
            Backend::CpuArm
        } else {
            Backend::CpuX86
        }
    }

    /// Coarse identity string used as a probe cache key component:
    /// `"{arch}_{cores}c_{totalGB}gb_{gpuType}"`.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}_{}c_{}gb_{}",
            self.cpu.arch,
            self.cpu.physical_cores,
            self.memory.total_gb.round() as u64,
            self.gpu.gpu_type
        )
    }

    /// Tier classification from combined accelerator memory and cores.
    /// A multi-GPU host with >=20 GB effective accelerator memory is
    /// promoted to at least `high`.
    pub fn tier(&self) -> HardwareTier {
        let accel = self.budget_gb();
        let cores = self.cpu.physical_cores;

        let base = if accel >= 64.0 && cores >= 12 {
            HardwareTier::Extreme
        } else if accel >= 32.0 && cores >= 8 {
            HardwareTier::VeryHigh
        } else if accel >= 16.0 {
            HardwareTier::High
        } else if accel >= 8.0 {
            HardwareTier::Medium
        } else {
            HardwareTier::Low
        };

        if self.gpu.is_multi_gpu && accel >= 20.0 && base < HardwareTier::High {
            HardwareTier::High
        } else {
            base
        }
    }

    /// One-line human description for report headers.
    pub fn description(&self) -> String {
        let gpu_part = if self.gpu.gpu_type == GpuType::CpuOnly {
            "CPU only".to_string()
        } else if self.gpu.vram_gb > 0.0 {
            format!("{} ({:.0}GB)", self.gpu.model, self.gpu.vram_gb)
        } else {
            self.gpu.model.clone()
        };
        format!(
            "{} / {}c / {:.0}GB RAM / {}",
            self.cpu.arch, self.cpu.physical_cores, self.memory.total_gb, gpu_part
        )
    }
}

impl Default for HardwareProfile {
    fn default() -> Self {
        Self::normalize(&Value::Null)
    }
}

// =============================================================================
// Normalization helpers
// =============================================================================

fn first_f64(candidates: &[Option<&Value>]) -> Option<f64> {
    candidates
        .iter()
        .flatten()
        .find_map(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
}

fn first_str(candidates: &[Option<&Value>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .find_map(|v| v.as_str())
        .map(str::to_string)
}

fn cpu_flag(cpu: &Value, key: &str, default: bool) -> bool {
    cpu.get(key)
        .and_then(Value::as_bool)
        .or_else(|| {
            cpu.get("flags")
                .and_then(Value::as_array)
                .map(|flags| flags.iter().any(|f| f.as_str() == Some(key)))
        })
        .unwrap_or(default)
}

fn looks_unified(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["apple", "m1", "m2", "m3", "m4", "unified"]
        .iter()
        .any(|needle| lower.contains(needle))
}

fn parse_arch(cpu: &Value, brand: &str, unified: bool) -> CpuArch {
    let declared = first_str(&[cpu.get("architecture"), cpu.get("arch")]);
    match declared.as_deref().map(str::to_lowercase).as_deref() {
        Some("apple_silicon") => return CpuArch::AppleSilicon,
        Some("arm64") | Some("aarch64") => {
            return if brand.to_lowercase().contains("apple") || unified {
                CpuArch::AppleSilicon
            } else {
                CpuArch::Arm64
            }
        }
        Some("x86_64") | Some("amd64") => return CpuArch::X86_64,
        _ => {}
    }
    if brand.to_lowercase().contains("apple") {
        CpuArch::AppleSilicon
    } else {
        CpuArch::X86_64
    }
}

fn parse_gpu_type(gpu: &Value, model: &str, unified: bool, vram_gb: f64) -> GpuType {
    if let Some(declared) = first_str(&[gpu.get("type"), gpu.get("gpu_type")]) {
        match declared.to_lowercase().as_str() {
            "apple_silicon" => return GpuType::AppleSilicon,
            "nvidia" => return GpuType::Nvidia,
            "amd" => return GpuType::Amd,
            "intel" => return GpuType::Intel,
            "cpu_only" => return GpuType::CpuOnly,
            _ => {}
        }
    }
    if unified {
        return GpuType::AppleSilicon;
    }
    let lower = model.to_lowercase();
    if ["nvidia", "geforce", "rtx", "gtx", "quadro", "tesla"]
        .iter()
        .any(|n| lower.contains(n))
    {
        GpuType::Nvidia
    } else if ["radeon", "amd", "rx "].iter().any(|n| lower.contains(n)) {
        GpuType::Amd
    } else if ["intel", "arc", "iris"].iter().any(|n| lower.contains(n)) {
        GpuType::Intel
    } else if vram_gb > 0.0 {
        // VRAM reported but vendor unknown; assume the common case
        GpuType::Nvidia
    } else {
        GpuType::CpuOnly
    }
}

fn per_gpu_entries(gpu: &Value) -> Vec<(String, f64)> {
    let list = gpu
        .get("gpus")
        .or_else(|| gpu.get("inventory"))
        .and_then(Value::as_array);

    let Some(list) = list else {
        return Vec::new();
    };

    list.iter()
        .map(|entry| {
            let name = first_str(&[entry.get("model"), entry.get("name")])
                .unwrap_or_else(|| entry.as_str().unwrap_or_default().to_string());
            let vram = first_f64(&[entry.get("vramGB"), entry.get("vram_gb"), entry.get("vram")])
                .unwrap_or(0.0);
            (name, vram)
        })
        .collect()
}
