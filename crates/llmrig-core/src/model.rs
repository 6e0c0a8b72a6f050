//! Model variant shapes and the descriptor types collaborators hand us.
//!
//! A [`ModelVariant`] is the canonical record the selector consumes: one per
//! (base model, variant tag, quantization class), produced by the pool
//! normalizer from installed-inventory and catalog descriptors.

use crate::freshness::FreshnessInfo;
use crate::quant::Quant;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Input modality a model supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Text,
    Vision,
}

/// Where a variant record originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    OllamaLocal,
    OllamaDatabase,
    StaticCatalog,
    EnhancedWithOllama,
    #[default]
    Unknown,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Source::OllamaLocal => "ollama_local",
            Source::OllamaDatabase => "ollama_database",
            Source::StaticCatalog => "static_catalog",
            Source::EnhancedWithOllama => "enhanced_with_ollama",
            Source::Unknown => "unknown",
        };
        f.write_str(token)
    }
}

/// Mixture-of-experts metadata, all fields optional because catalogs rarely
/// report the full set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoeMetadata {
    pub total_params_b: Option<f64>,
    pub active_params_b: Option<f64>,
    pub expert_count: Option<u32>,
    pub experts_active_per_token: Option<u32>,
}

/// Canonical per-variant model record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVariant {
    /// Stable identifier, `family:tag` form (e.g. `qwen2.5:7b-instruct`).
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Inferred family (e.g. `qwen2.5`, `llama3.1`).
    pub family: String,
    pub version: Option<String>,

    /// Effective/dense parameter count in billions.
    pub params_b: f64,
    /// Maximum context window in tokens.
    pub ctx_max: u32,
    /// Quantization declared by the variant tag, when one was.
    pub quant: Option<Quant>,
    /// Observed artifact size in GB, when known.
    pub size_gb: Option<f64>,
    /// Observed sizes of sibling variants in the same parameter class.
    pub size_by_quant: BTreeMap<Quant, f64>,
    /// Quantizations believed available, ordered best quality first.
    pub available_quantizations: Vec<Quant>,

    pub modalities: BTreeSet<Modality>,
    pub tags: BTreeSet<String>,

    pub is_moe: bool,
    #[serde(default)]
    pub moe: MoeMetadata,

    #[serde(default)]
    pub freshness: FreshnessInfo,

    #[serde(default)]
    pub source: Source,
    pub registry: Option<String>,
    /// Canonicalized license token (e.g. `apache-2.0`).
    pub license: Option<String>,
    pub digest: Option<String>,
    pub pulls: Option<u64>,

    pub installed: bool,
}

impl ModelVariant {
    /// Minimal variant for construction sites that fill in the rest.
    pub fn new(identifier: impl Into<String>, params_b: f64, ctx_max: u32) -> Self {
        let identifier = identifier.into();
        let name = identifier.clone();
        Self {
            identifier,
            name,
            family: String::new(),
            version: None,
            params_b,
            ctx_max,
            quant: None,
            size_gb: None,
            size_by_quant: BTreeMap::new(),
            available_quantizations: Quant::LADDER.to_vec(),
            modalities: BTreeSet::from([Modality::Text]),
            tags: BTreeSet::new(),
            is_moe: false,
            moe: MoeMetadata::default(),
            freshness: FreshnessInfo::default(),
            source: Source::Unknown,
            registry: None,
            license: None,
            digest: None,
            pulls: None,
            installed: false,
        }
    }

    /// Whether any tag matches (case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        let lower = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == lower)
    }

    /// Whether the variant handles images.
    pub fn has_vision(&self) -> bool {
        self.modalities.contains(&Modality::Vision) || self.has_tag("vision")
    }
}

/// Descriptor for a locally installed model, as reported by the inventory
/// collaborator (e.g. the Ollama daemon's tag listing).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstalledModelDescriptor {
    pub identifier: String,
    pub params_b: Option<f64>,
    pub quant: Option<String>,
    pub context_length: Option<u32>,
    pub size_gb: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub digest: Option<String>,
    pub license: Option<String>,
}

/// One variant tag of a catalog model, with whatever hints the catalog had.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogVariantHint {
    /// Variant tag, e.g. `7b`, `7b-instruct-q4_K_M`, `70b`.
    pub tag: String,
    pub params_b: Option<f64>,
    pub size_gb: Option<f64>,
    pub quant: Option<String>,
    pub context_length: Option<u32>,
}

/// Descriptor for a catalog model covering one or more variant tags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogModelDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub variants: Vec<CatalogVariantHint>,
    pub context_length: Option<u32>,
    pub moe: Option<MoeMetadata>,
    /// Loose freshness timestamps; the first present is used.
    pub last_updated: Option<String>,
    pub updated_at: Option<String>,
    pub release_date: Option<String>,
    pub created_at: Option<String>,
    pub registry: Option<String>,
    pub license: Option<String>,
    pub pulls: Option<u64>,
    #[serde(default)]
    pub source: Source,
}

impl CatalogModelDescriptor {
    /// First freshness timestamp the catalog reported, in declaration
    /// priority order.
    pub fn freshness_timestamp(&self) -> Option<&str> {
        self.last_updated
            .as_deref()
            .or(self.updated_at.as_deref())
            .or(self.release_date.as_deref())
            .or(self.created_at.as_deref())
    }
}

/// Per-component scores of an evaluated candidate, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub q: f64,
    pub s: f64,
    pub f: f64,
    pub c: f64,
}

impl Components {
    /// True when every component sits in [0, 100].
    pub fn in_range(&self) -> bool {
        [self.q, self.s, self.f, self.c]
            .iter()
            .all(|v| (0.0..=100.0).contains(v))
    }
}

/// An evaluated (model, quantization) candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub variant: ModelVariant,
    pub quant: Quant,
    pub required_gb: f64,
    pub est_tps: f64,
    /// Probe-measured tokens/sec, when a probe ran.
    pub measured_tps: Option<f64>,
    pub components: Components,
    pub score: f64,
    /// Score recomputed after probing, when a probe ran.
    pub final_score: Option<f64>,
    pub rationale: Vec<String>,
}

impl Candidate {
    /// The score ranking should use: probe-adjusted when present.
    pub fn effective_score(&self) -> f64 {
        self.final_score.unwrap_or(self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_new_defaults() {
        let variant = ModelVariant::new("qwen2.5:7b", 7.6, 32_768);
        assert_eq!(variant.identifier, "qwen2.5:7b");
        assert_eq!(variant.params_b, 7.6);
        assert!(!variant.installed);
        assert_eq!(variant.available_quantizations, Quant::LADDER.to_vec());
        assert!(variant.modalities.contains(&Modality::Text));
    }

    #[test]
    fn test_has_tag_case_insensitive() {
        let mut variant = ModelVariant::new("deepseek-coder:6.7b", 6.7, 16_384);
        variant.tags.insert("Coder".to_string());
        assert!(variant.has_tag("coder"));
        assert!(!variant.has_tag("vision"));
    }

    #[test]
    fn test_has_vision_via_modality_or_tag() {
        let mut by_modality = ModelVariant::new("llava:7b", 7.0, 4096);
        by_modality.modalities.insert(Modality::Vision);
        assert!(by_modality.has_vision());

        let mut by_tag = ModelVariant::new("minicpm-v:8b", 8.0, 8192);
        by_tag.tags.insert("vision".to_string());
        assert!(by_tag.has_vision());
    }

    #[test]
    fn test_source_display_tokens() {
        assert_eq!(Source::OllamaLocal.to_string(), "ollama_local");
        assert_eq!(Source::EnhancedWithOllama.to_string(), "enhanced_with_ollama");
        assert_eq!(Source::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_source_serde_tokens() {
        let json = serde_json::to_string(&Source::StaticCatalog).unwrap();
        assert_eq!(json, r#""static_catalog""#);
    }

    #[test]
    fn test_components_in_range() {
        let good = Components {
            q: 75.0,
            s: 100.0,
            f: 0.0,
            c: 70.0,
        };
        assert!(good.in_range());

        let bad = Components {
            q: 101.0,
            s: 50.0,
            f: 50.0,
            c: 50.0,
        };
        assert!(!bad.in_range());
    }

    #[test]
    fn test_effective_score_prefers_final() {
        let variant = ModelVariant::new("m:7b", 7.0, 4096);
        let mut candidate = Candidate {
            variant,
            quant: Quant::Q4_K_M,
            required_gb: 5.0,
            est_tps: 20.0,
            measured_tps: None,
            components: Components {
                q: 75.0,
                s: 50.0,
                f: 100.0,
                c: 100.0,
            },
            score: 72.5,
            final_score: None,
            rationale: vec![],
        };
        assert_eq!(candidate.effective_score(), 72.5);
        candidate.final_score = Some(80.1);
        assert_eq!(candidate.effective_score(), 80.1);
    }

    #[test]
    fn test_catalog_freshness_timestamp_priority() {
        let descriptor = CatalogModelDescriptor {
            name: "qwen2.5".to_string(),
            updated_at: Some("2025-06-01".to_string()),
            release_date: Some("2024-09-19".to_string()),
            ..Default::default()
        };
        assert_eq!(descriptor.freshness_timestamp(), Some("2025-06-01"));
    }

    #[test]
    fn test_variant_serialization_roundtrip() {
        let mut variant = ModelVariant::new("gemma2:9b", 9.2, 8192);
        variant.size_by_quant.insert(Quant::Q4_K_M, 5.4);
        variant.tags.insert("instruct".to_string());

        let json = serde_json::to_string(&variant).unwrap();
        let parsed: ModelVariant = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.identifier, "gemma2:9b");
        assert_eq!(parsed.size_by_quant.get(&Quant::Q4_K_M), Some(&5.4));
    }
}
