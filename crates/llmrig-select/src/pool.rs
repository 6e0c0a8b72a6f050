//! Model pool normalization.
//!
//! Merges the installed inventory with a scraped catalog into one
//! [`ModelVariant`] record per (parameter class, variant tag), deduplicated
//! by identifier with installed copies preferred. Malformed entries are
//! skipped with a warning; the selector never crashes on a bad pool entry.

use chrono::{DateTime, Utc};
use llmrig_core::{
    defaults, CatalogModelDescriptor, FreshnessInfo, InstalledModelDescriptor, Modality,
    ModelVariant, Quant, Source,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Sibling variants within this parameter distance share size observations.
const SIBLING_PARAMS_TOLERANCE_B: f64 = 0.25;

/// Family inference priority table. First substring match wins.
const FAMILY_PATTERNS: [&str; 13] = [
    "qwen2.5",
    "qwen3",
    "deepseek",
    "llama3.2",
    "llama3.1",
    "mistral",
    "gemma2",
    "phi-3",
    "llava",
    "granite",
    "solar",
    "starcoder",
    "minicpm",
];

/// Parse a parameter count from loose tag text: `7b` -> 7.0, `405b` ->
/// 405.0, `22m` -> 0.022, `1.5b` -> 1.5. The unit letter must terminate
/// its token so quant suffixes like `q4_K_M` do not match.
pub fn parse_params_b(text: &str) -> Option<f64> {
    let lower = text.to_lowercase();
    let bytes = lower.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
            i += 1;
        }
        if i < bytes.len() && (bytes[i] == b'b' || bytes[i] == b'm') {
            let terminated = bytes
                .get(i + 1)
                .map_or(true, |c| !c.is_ascii_alphanumeric());
            if terminated {
                if let Ok(value) = lower[start..i].parse::<f64>() {
                    let params = if bytes[i] == b'b' { value } else { value / 1000.0 };
                    if params > 0.0 {
                        return Some(params);
                    }
                }
            }
            i += 1;
        }
    }
    None
}

/// Infer a model family from its name using the priority table, falling
/// back to the base name before any `:` or `/`.
pub fn infer_family(name: &str) -> String {
    let lower = name.to_lowercase();
    for pattern in FAMILY_PATTERNS {
        if lower.contains(pattern) {
            return pattern.to_string();
        }
    }
    lower
        .split([':', '/'])
        .next()
        .unwrap_or(&lower)
        .to_string()
}

fn has_vision_cue(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("vision") || lower.contains("llava") || lower.contains("vl")
}

/// Tags derivable from variant-tag text itself.
fn tags_from_tag_text(tag: &str) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    for token in tag.to_lowercase().split(['-', '_', ':']) {
        match token {
            "instruct" | "chat" | "coder" | "code" | "vision" | "embedding" | "reasoning"
            | "creative" => {
                tags.insert(token.to_string());
            }
            "vl" => {
                tags.insert("vision".to_string());
            }
            _ => {}
        }
    }
    tags
}

/// Quantizations believed available: the union of declared levels expanded
/// downward from the best known one. With no declaration at all, the full
/// ladder is assumed.
fn expand_quantizations(declared: &BTreeSet<Quant>) -> Vec<Quant> {
    match declared.iter().max() {
        Some(best) => best.and_below(),
        None => Quant::LADDER.to_vec(),
    }
}

fn canonicalize_license(license: Option<&str>) -> Option<String> {
    license.map(|l| l.trim().to_lowercase().replace(' ', "-"))
}

/// Build the unified model pool from the installed inventory and the
/// catalog. `index_age_days` is the age of the catalog scrape itself;
/// `now` anchors all freshness math.
pub fn load_pool(
    installed: &[InstalledModelDescriptor],
    catalog: &[CatalogModelDescriptor],
    index_age_days: Option<i64>,
    now: DateTime<Utc>,
) -> Vec<ModelVariant> {
    let mut pool: BTreeMap<String, ModelVariant> = BTreeMap::new();

    for descriptor in catalog {
        if descriptor.name.trim().is_empty() {
            warn!(
                subsystem = "select",
                component = "pool",
                "skipping catalog entry with empty name"
            );
            continue;
        }

        // Pre-resolve (params, quant, size) per hint so sibling size maps
        // can be assembled within the parameter class.
        let resolved: Vec<(usize, f64, Option<Quant>, Option<f64>)> = descriptor
            .variants
            .iter()
            .enumerate()
            .filter_map(|(idx, hint)| {
                let params = hint.params_b.or_else(|| parse_params_b(&hint.tag));
                match params {
                    Some(params) if params > 0.0 => {
                        let quant = hint
                            .quant
                            .as_deref()
                            .and_then(|q| q.parse::<Quant>().ok())
                            .or_else(|| Quant::from_tag_text(&hint.tag));
                        Some((idx, params, quant, hint.size_gb))
                    }
                    _ => {
                        warn!(
                            subsystem = "select",
                            component = "pool",
                            model = %descriptor.name,
                            tag = %hint.tag,
                            "skipping variant with no parseable parameter count"
                        );
                        None
                    }
                }
            })
            .collect();

        let freshness = FreshnessInfo::compute(
            descriptor.freshness_timestamp(),
            &descriptor.description,
            index_age_days,
            now,
        );

        for &(idx, params_b, quant, size_gb) in &resolved {
            let hint = &descriptor.variants[idx];
            let identifier = format!("{}:{}", descriptor.name, hint.tag);

            // Sibling observations inside the same parameter class only;
            // a 7B size must never blend into a 70B record.
            let mut size_by_quant = BTreeMap::new();
            let mut declared_quants = BTreeSet::new();
            for &(_, sibling_params, sibling_quant, sibling_size) in &resolved {
                if (sibling_params - params_b).abs() > SIBLING_PARAMS_TOLERANCE_B {
                    continue;
                }
                if let Some(q) = sibling_quant {
                    declared_quants.insert(q);
                    if let Some(size) = sibling_size {
                        size_by_quant.entry(q).or_insert(size);
                    }
                }
            }

            let mut tags: BTreeSet<String> = descriptor
                .tags
                .iter()
                .map(|t| t.to_lowercase())
                .collect();
            tags.extend(tags_from_tag_text(&hint.tag));

            let mut modalities = BTreeSet::from([Modality::Text]);
            if has_vision_cue(&hint.tag)
                || has_vision_cue(&descriptor.name)
                || has_vision_cue(&descriptor.description)
                || tags.contains("vision")
            {
                modalities.insert(Modality::Vision);
            }

            let moe = descriptor.moe.clone().unwrap_or_default();
            let is_moe = descriptor.moe.is_some()
                && (moe.total_params_b.is_some()
                    || moe.active_params_b.is_some()
                    || moe.expert_count.is_some());

            let variant = ModelVariant {
                identifier: identifier.clone(),
                name: descriptor.name.clone(),
                family: infer_family(&descriptor.name),
                version: None,
                params_b,
                ctx_max: hint
                    .context_length
                    .or(descriptor.context_length)
                    .unwrap_or(defaults::CONTEXT_TOKENS),
                quant,
                size_gb,
                size_by_quant,
                available_quantizations: expand_quantizations(&declared_quants),
                modalities,
                tags,
                is_moe,
                moe,
                freshness: freshness.clone(),
                source: match descriptor.source {
                    Source::Unknown => Source::StaticCatalog,
                    other => other,
                },
                registry: descriptor.registry.clone(),
                license: canonicalize_license(descriptor.license.as_deref()),
                digest: None,
                pulls: descriptor.pulls,
                installed: false,
            };

            // Dedup by identifier; first catalog writer wins.
            pool.entry(identifier).or_insert(variant);
        }
    }

    // Installed overlay: enrich catalog records and add local-only models.
    for descriptor in installed {
        if descriptor.identifier.trim().is_empty() {
            warn!(
                subsystem = "select",
                component = "pool",
                "skipping installed entry with empty identifier"
            );
            continue;
        }

        if let Some(existing) = pool.get_mut(&descriptor.identifier) {
            existing.installed = true;
            existing.source = Source::EnhancedWithOllama;
            if let Some(size) = descriptor.size_gb {
                existing.size_gb = Some(size);
                if let Some(q) = existing.quant {
                    existing.size_by_quant.insert(q, size);
                }
            }
            if descriptor.digest.is_some() {
                existing.digest = descriptor.digest.clone();
            }
            continue;
        }

        let tag = descriptor
            .identifier
            .split_once(':')
            .map(|(_, tag)| tag)
            .unwrap_or("");
        let params_b = descriptor
            .params_b
            .or_else(|| parse_params_b(&descriptor.identifier));
        let Some(params_b) = params_b.filter(|p| *p > 0.0) else {
            warn!(
                subsystem = "select",
                component = "pool",
                model = %descriptor.identifier,
                "skipping installed model with no parseable parameter count"
            );
            continue;
        };

        let quant = descriptor
            .quant
            .as_deref()
            .and_then(|q| q.parse::<Quant>().ok())
            .or_else(|| Quant::from_tag_text(&descriptor.identifier));

        let mut tags: BTreeSet<String> =
            descriptor.tags.iter().map(|t| t.to_lowercase()).collect();
        tags.extend(tags_from_tag_text(tag));

        let mut modalities = BTreeSet::from([Modality::Text]);
        if has_vision_cue(&descriptor.identifier) || tags.contains("vision") {
            modalities.insert(Modality::Vision);
        }

        let mut size_by_quant = BTreeMap::new();
        if let (Some(q), Some(size)) = (quant, descriptor.size_gb) {
            size_by_quant.insert(q, size);
        }
        let declared: BTreeSet<Quant> = quant.into_iter().collect();

        let variant = ModelVariant {
            identifier: descriptor.identifier.clone(),
            name: descriptor
                .identifier
                .split_once(':')
                .map(|(name, _)| name.to_string())
                .unwrap_or_else(|| descriptor.identifier.clone()),
            family: infer_family(&descriptor.identifier),
            version: None,
            params_b,
            ctx_max: descriptor
                .context_length
                .unwrap_or(defaults::CONTEXT_TOKENS),
            quant,
            size_gb: descriptor.size_gb,
            size_by_quant,
            available_quantizations: expand_quantizations(&declared),
            modalities,
            tags,
            is_moe: false,
            moe: Default::default(),
            freshness: FreshnessInfo::default(),
            source: Source::OllamaLocal,
            registry: None,
            license: canonicalize_license(descriptor.license.as_deref()),
            digest: descriptor.digest.clone(),
            pulls: None,
            installed: true,
        };
        pool.insert(descriptor.identifier.clone(), variant);
    }

    debug!(
        subsystem = "select",
        component = "pool",
        candidate_count = pool.len(),
        "model pool loaded"
    );

    pool.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use llmrig_core::CatalogVariantHint;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn hint(tag: &str) -> CatalogVariantHint {
        CatalogVariantHint {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_params_basic() {
        assert_eq!(parse_params_b("7b"), Some(7.0));
        assert_eq!(parse_params_b("3B"), Some(3.0));
        assert_eq!(parse_params_b("405b"), Some(405.0));
        assert_eq!(parse_params_b("1.5b"), Some(1.5));
    }

    #[test]
    fn test_parse_params_millions() {
        let parsed = parse_params_b("22m").unwrap();
        assert!((parsed - 0.022).abs() < 1e-9);
    }

    #[test]
    fn test_parse_params_inside_composite_tag() {
        assert_eq!(parse_params_b("7b-instruct-q4_K_M"), Some(7.0));
        assert_eq!(parse_params_b("llava:13b-v1.6"), Some(13.0));
    }

    #[test]
    fn test_parse_params_moe_tag() {
        // `8x7b` reads the per-expert size, not `8`.
        assert_eq!(parse_params_b("8x7b"), Some(7.0));
    }

    #[test]
    fn test_parse_params_quant_suffix_is_not_params() {
        assert_eq!(parse_params_b("q4_K_M"), None);
        assert_eq!(parse_params_b("instruct"), None);
    }

    #[test]
    fn test_infer_family_priority_table() {
        assert_eq!(infer_family("qwen2.5-coder"), "qwen2.5");
        assert_eq!(infer_family("deepseek-r1"), "deepseek");
        assert_eq!(infer_family("llama3.1"), "llama3.1");
        assert_eq!(infer_family("MiniCPM-V"), "minicpm");
    }

    #[test]
    fn test_infer_family_fallback() {
        assert_eq!(infer_family("smollm2:1.7b"), "smollm2");
    }

    #[test]
    fn test_load_pool_emits_one_variant_per_tag() {
        let catalog = vec![CatalogModelDescriptor {
            name: "qwen2.5".to_string(),
            variants: vec![hint("7b"), hint("14b"), hint("32b")],
            ..Default::default()
        }];
        let pool = load_pool(&[], &catalog, None, fixed_now());
        assert_eq!(pool.len(), 3);
        assert!(pool.iter().any(|v| v.identifier == "qwen2.5:7b"));
        assert!(pool.iter().any(|v| v.identifier == "qwen2.5:32b"));
    }

    #[test]
    fn test_load_pool_skips_unparseable_variant() {
        let catalog = vec![CatalogModelDescriptor {
            name: "mystery".to_string(),
            variants: vec![hint("latest"), hint("7b")],
            ..Default::default()
        }];
        let pool = load_pool(&[], &catalog, None, fixed_now());
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].identifier, "mystery:7b");
    }

    #[test]
    fn test_size_by_quant_stays_within_parameter_class() {
        let catalog = vec![CatalogModelDescriptor {
            name: "deepfit".to_string(),
            variants: vec![
                CatalogVariantHint {
                    tag: "7b-q4_K_M".to_string(),
                    size_gb: Some(4.4),
                    ..Default::default()
                },
                CatalogVariantHint {
                    tag: "7b-q8_0".to_string(),
                    size_gb: Some(8.1),
                    ..Default::default()
                },
                CatalogVariantHint {
                    tag: "70b-q4_K_M".to_string(),
                    size_gb: Some(42.5),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }];
        let pool = load_pool(&[], &catalog, None, fixed_now());
        let small = pool
            .iter()
            .find(|v| v.identifier == "deepfit:7b-q4_K_M")
            .unwrap();
        assert_eq!(small.size_by_quant.get(&Quant::Q4_K_M), Some(&4.4));
        assert_eq!(small.size_by_quant.get(&Quant::Q8_0), Some(&8.1));
        // The 70B size never bleeds into the 7B class.
        assert!(!small.size_by_quant.values().any(|s| *s > 40.0));

        let large = pool
            .iter()
            .find(|v| v.identifier == "deepfit:70b-q4_K_M")
            .unwrap();
        assert_eq!(large.size_by_quant.get(&Quant::Q4_K_M), Some(&42.5));
        assert_eq!(large.size_by_quant.len(), 1);
    }

    #[test]
    fn test_available_quantizations_expand_downward() {
        let catalog = vec![CatalogModelDescriptor {
            name: "deepfit".to_string(),
            variants: vec![hint("7b-q5_K_M")],
            ..Default::default()
        }];
        let pool = load_pool(&[], &catalog, None, fixed_now());
        assert_eq!(
            pool[0].available_quantizations,
            vec![Quant::Q5_K_M, Quant::Q4_K_M, Quant::Q3_K, Quant::Q2_K]
        );
    }

    #[test]
    fn test_available_quantizations_default_full_ladder() {
        let catalog = vec![CatalogModelDescriptor {
            name: "deepfit".to_string(),
            variants: vec![hint("7b")],
            ..Default::default()
        }];
        let pool = load_pool(&[], &catalog, None, fixed_now());
        assert_eq!(pool[0].available_quantizations, Quant::LADDER.to_vec());
    }

    #[test]
    fn test_vision_cues_set_modalities() {
        let catalog = vec![CatalogModelDescriptor {
            name: "visionduo".to_string(),
            variants: vec![hint("8b-vl")],
            ..Default::default()
        }];
        let pool = load_pool(&[], &catalog, None, fixed_now());
        assert!(pool[0].modalities.contains(&Modality::Vision));
        assert!(pool[0].has_vision());
    }

    #[test]
    fn test_text_only_without_cues() {
        let catalog = vec![CatalogModelDescriptor {
            name: "qwen2.5".to_string(),
            variants: vec![hint("7b-instruct")],
            ..Default::default()
        }];
        let pool = load_pool(&[], &catalog, None, fixed_now());
        assert!(!pool[0].modalities.contains(&Modality::Vision));
        assert!(pool[0].tags.contains("instruct"));
    }

    #[test]
    fn test_missing_context_defaults() {
        let catalog = vec![CatalogModelDescriptor {
            name: "qwen2.5".to_string(),
            variants: vec![hint("7b")],
            ..Default::default()
        }];
        let pool = load_pool(&[], &catalog, None, fixed_now());
        assert_eq!(pool[0].ctx_max, defaults::CONTEXT_TOKENS);
    }

    #[test]
    fn test_installed_overlay_enriches_catalog_entry() {
        let catalog = vec![CatalogModelDescriptor {
            name: "qwen2.5".to_string(),
            variants: vec![CatalogVariantHint {
                tag: "7b-q4_K_M".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }];
        let installed = vec![InstalledModelDescriptor {
            identifier: "qwen2.5:7b-q4_K_M".to_string(),
            size_gb: Some(4.7),
            digest: Some("sha256:abc".to_string()),
            ..Default::default()
        }];
        let pool = load_pool(&installed, &catalog, None, fixed_now());
        assert_eq!(pool.len(), 1);
        let variant = &pool[0];
        assert!(variant.installed);
        assert_eq!(variant.source, Source::EnhancedWithOllama);
        assert_eq!(variant.size_gb, Some(4.7));
        assert_eq!(variant.size_by_quant.get(&Quant::Q4_K_M), Some(&4.7));
        assert_eq!(variant.digest.as_deref(), Some("sha256:abc"));
    }

    #[test]
    fn test_installed_only_model_is_created() {
        let installed = vec![InstalledModelDescriptor {
            identifier: "deepseek-coder:6.7b".to_string(),
            size_gb: Some(3.8),
            ..Default::default()
        }];
        let pool = load_pool(&installed, &[], None, fixed_now());
        assert_eq!(pool.len(), 1);
        let variant = &pool[0];
        assert!(variant.installed);
        assert_eq!(variant.source, Source::OllamaLocal);
        assert_eq!(variant.params_b, 6.7);
        assert_eq!(variant.family, "deepseek");
    }

    #[test]
    fn test_installed_without_params_is_skipped() {
        let installed = vec![InstalledModelDescriptor {
            identifier: "mystery:latest".to_string(),
            ..Default::default()
        }];
        let pool = load_pool(&installed, &[], None, fixed_now());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_empty_inputs_yield_empty_pool() {
        let pool = load_pool(&[], &[], None, fixed_now());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_license_canonicalized() {
        let catalog = vec![CatalogModelDescriptor {
            name: "qwen2.5".to_string(),
            license: Some("Apache 2.0".to_string()),
            variants: vec![hint("7b")],
            ..Default::default()
        }];
        let pool = load_pool(&[], &catalog, None, fixed_now());
        assert_eq!(pool[0].license.as_deref(), Some("apache-2.0"));
    }

    #[test]
    fn test_moe_metadata_carried() {
        let catalog = vec![CatalogModelDescriptor {
            name: "mixtral".to_string(),
            moe: Some(llmrig_core::MoeMetadata {
                total_params_b: Some(46.7),
                active_params_b: Some(12.9),
                expert_count: Some(8),
                experts_active_per_token: Some(2),
            }),
            variants: vec![hint("8x7b")],
            ..Default::default()
        }];
        let pool = load_pool(&[], &catalog, None, fixed_now());
        assert!(pool[0].is_moe);
        assert_eq!(pool[0].moe.active_params_b, Some(12.9));
    }

    #[test]
    fn test_pool_output_is_sorted_and_deterministic() {
        let catalog = vec![
            CatalogModelDescriptor {
                name: "zephyr".to_string(),
                variants: vec![hint("7b")],
                ..Default::default()
            },
            CatalogModelDescriptor {
                name: "aya".to_string(),
                variants: vec![hint("8b")],
                ..Default::default()
            },
        ];
        let first = load_pool(&[], &catalog, None, fixed_now());
        let second = load_pool(&[], &catalog, None, fixed_now());
        let ids: Vec<_> = first.iter().map(|v| v.identifier.clone()).collect();
        assert_eq!(ids, vec!["aya:8b", "zephyr:7b"]);
        assert_eq!(
            ids,
            second.iter().map(|v| v.identifier.clone()).collect::<Vec<_>>()
        );
    }
}
