//! Per-category recommendations and the machine summary.

use crate::category::{OptimizeFor, TaskCategory};
use crate::pipeline::{SelectOptions, Selector};
use chrono::{DateTime, Utc};
use llmrig_core::{Candidate, HardwareProfile, HardwareTier, ModelVariant, RuntimeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Options for a full per-category recommendation pass.
#[derive(Debug, Clone)]
pub struct RecommendOptions {
    pub optimize_for: OptimizeFor,
    pub runtime: RuntimeKind,
    pub now: DateTime<Utc>,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            optimize_for: OptimizeFor::Balanced,
            runtime: RuntimeKind::Ollama,
            now: Utc::now(),
        }
    }
}

/// Static description of a category on the recommendation surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub description: String,
    pub target_tps: f64,
}

/// Recommendation block for one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRecommendation {
    pub tier: HardwareTier,
    pub best_models: Vec<Candidate>,
    pub total_evaluated: usize,
    pub category_info: CategoryInfo,
}

/// Machine-level summary across all recommended categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub hardware_tier: HardwareTier,
    /// Identifier of the strongest candidate across all categories.
    pub best_overall: Option<String>,
    /// Top pick per category, when the category produced one.
    pub by_category: BTreeMap<String, String>,
    /// Commands to get started with the top picks.
    pub quick_commands: Vec<String>,
}

/// Run the selector for the fixed recommended category set.
pub fn recommend_per_category(
    hardware: &HardwareProfile,
    pool: &[ModelVariant],
    options: &RecommendOptions,
) -> BTreeMap<TaskCategory, CategoryRecommendation> {
    let selector = Selector::new(hardware.clone(), pool.to_vec());
    let select_options = SelectOptions {
        optimize_for: options.optimize_for,
        runtime: options.runtime,
        now: options.now,
        ..Default::default()
    };
    let tier = hardware.tier();

    TaskCategory::RECOMMENDED
        .iter()
        .map(|&category| {
            let report = selector.select_models(category, &select_options);
            (
                category,
                CategoryRecommendation {
                    tier,
                    best_models: report.candidates,
                    total_evaluated: report.total_evaluated,
                    category_info: CategoryInfo {
                        description: category.description().to_string(),
                        target_tps: category.target_tps(),
                    },
                },
            )
        })
        .collect()
}

/// Condense a recommendation pass into the summary record.
pub fn summarize(
    recommendations: &BTreeMap<TaskCategory, CategoryRecommendation>,
    hardware: &HardwareProfile,
) -> Summary {
    let mut by_category = BTreeMap::new();
    let mut quick_commands = Vec::new();
    let mut best: Option<(&Candidate, TaskCategory)> = None;

    for (&category, recommendation) in recommendations {
        let Some(top) = recommendation.best_models.first() else {
            continue;
        };
        by_category.insert(category.to_string(), top.variant.identifier.clone());

        let command = if top.variant.installed {
            format!("ollama run {}", top.variant.identifier)
        } else {
            format!("ollama pull {}", top.variant.identifier)
        };
        if !quick_commands.contains(&command) {
            quick_commands.push(command);
        }

        let is_better = match best {
            None => true,
            Some((current, _)) => top.effective_score() > current.effective_score(),
        };
        if is_better {
            best = Some((top, category));
        }
    }

    Summary {
        hardware_tier: hardware.tier(),
        best_overall: best.map(|(candidate, _)| candidate.variant.identifier.clone()),
        by_category,
        quick_commands,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn hardware() -> HardwareProfile {
        HardwareProfile::normalize(&json!({
            "cpu": {"architecture": "x86_64", "cores": 16},
            "memory": {"totalGB": 64},
            "gpu": {"model": "NVIDIA RTX 3090", "vramGB": 24}
        }))
    }

    fn pool() -> Vec<ModelVariant> {
        let mut coder = ModelVariant::new("qwen2.5-coder:7b", 7.6, 32_768);
        coder.family = "qwen2.5".to_string();
        coder.tags.insert("coder".to_string());

        let mut chat = ModelVariant::new("llama3.1:8b", 8.0, 131_072);
        chat.family = "llama3.1".to_string();
        chat.tags.insert("instruct".to_string());
        chat.installed = true;

        let mut vision = ModelVariant::new("llava:7b", 7.0, 4096);
        vision.family = "llava".to_string();
        vision.tags.insert("vision".to_string());

        vec![coder, chat, vision]
    }

    fn options() -> RecommendOptions {
        RecommendOptions {
            now: fixed_now(),
            ..Default::default()
        }
    }

    #[test]
    fn test_recommend_covers_fixed_categories() {
        let recommendations = recommend_per_category(&hardware(), &pool(), &options());
        assert_eq!(recommendations.len(), 7);
        assert!(recommendations.contains_key(&TaskCategory::Coding));
        assert!(recommendations.contains_key(&TaskCategory::General));
        assert!(!recommendations.contains_key(&TaskCategory::Embeddings));
    }

    #[test]
    fn test_coding_recommendation_prefers_coder() {
        let recommendations = recommend_per_category(&hardware(), &pool(), &options());
        let coding = &recommendations[&TaskCategory::Coding];
        assert_eq!(
            coding.best_models[0].variant.identifier,
            "qwen2.5-coder:7b"
        );
    }

    #[test]
    fn test_multimodal_recommendation_requires_vision() {
        let recommendations = recommend_per_category(&hardware(), &pool(), &options());
        let multimodal = &recommendations[&TaskCategory::Multimodal];
        assert_eq!(multimodal.best_models.len(), 1);
        assert_eq!(multimodal.best_models[0].variant.identifier, "llava:7b");
    }

    #[test]
    fn test_category_info_populated() {
        let recommendations = recommend_per_category(&hardware(), &pool(), &options());
        let reasoning = &recommendations[&TaskCategory::Reasoning];
        assert_eq!(reasoning.category_info.target_tps, 25.0);
        assert!(!reasoning.category_info.description.is_empty());
    }

    #[test]
    fn test_summarize_best_overall_and_commands() {
        let recommendations = recommend_per_category(&hardware(), &pool(), &options());
        let summary = summarize(&recommendations, &hardware());

        assert_eq!(summary.hardware_tier, HardwareTier::High);
        assert!(summary.best_overall.is_some());
        assert!(!summary.by_category.is_empty());
        assert!(!summary.quick_commands.is_empty());

        // Installed model surfaces as `run`, missing ones as `pull`.
        assert!(summary
            .quick_commands
            .iter()
            .any(|c| c == "ollama run llama3.1:8b"));
        assert!(summary
            .quick_commands
            .iter()
            .any(|c| c.starts_with("ollama pull")));
    }

    #[test]
    fn test_summarize_empty_recommendations() {
        let recommendations = recommend_per_category(&hardware(), &[], &options());
        let summary = summarize(&recommendations, &hardware());
        assert!(summary.best_overall.is_none());
        assert!(summary.by_category.is_empty());
        assert!(summary.quick_commands.is_empty());
    }

    #[test]
    fn test_summarize_is_deterministic() {
        let recommendations = recommend_per_category(&hardware(), &pool(), &options());
        let first = serde_json::to_string(&summarize(&recommendations, &hardware())).unwrap();
        let second = serde_json::to_string(&summarize(&recommendations, &hardware())).unwrap();
        assert_eq!(first, second);
    }
}
