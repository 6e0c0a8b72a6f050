//! # llmrig-core
//!
//! Core types, tables, and traits for the llmrig selection engine.
//!
//! This crate provides the canonical data shapes the other llmrig crates
//! consume: the normalized hardware profile, the quantization ladder with
//! its size/speed/quality tables, model variant records, freshness math,
//! the runtime executor seam, and the shared error type.

pub mod defaults;
pub mod error;
pub mod freshness;
pub mod hardware;
pub mod logging;
pub mod model;
pub mod quant;
pub mod runtime;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use freshness::FreshnessInfo;
pub use hardware::{
    Acceleration, Backend, CpuArch, CpuInfo, GpuInfo, GpuType, HardwareProfile, HardwareTier,
    MemoryInfo,
};
pub use model::{
    Candidate, CatalogModelDescriptor, CatalogVariantHint, Components, InstalledModelDescriptor,
    Modality, ModelVariant, MoeMetadata, Source,
};
pub use quant::Quant;
pub use runtime::{GenerationOptions, GenerationRun, RuntimeExecutor, RuntimeKind};
