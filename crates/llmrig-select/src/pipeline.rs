//! Candidate pipeline: per-category filtering, per-model evaluation,
//! deterministic ranking, and mid-tier coverage enforcement.
//!
//! Per-candidate evaluation is a pure function over the
//! `(HardwareProfile, ModelVariant)` pair. The output list is fully ordered
//! by a stable key (score, parameter count, installed-first, identifier) so
//! identical inputs always produce identical output.

use crate::category::{OptimizeFor, TaskCategory};
use crate::memory::required_gb;
use crate::scoring::{context_score, fit_score, quality_prior, Weights};
use crate::speed::{estimate_tps, speed_score};
use chrono::{DateTime, Utc};
use llmrig_core::{
    defaults, Candidate, Components, HardwareProfile, HardwareTier, ModelVariant, Quant,
    RuntimeKind,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, trace};

/// Categories protected by the mid-tier coverage safeguard.
const MID_TIER_CATEGORIES: [TaskCategory; 6] = [
    TaskCategory::General,
    TaskCategory::Talking,
    TaskCategory::Reading,
    TaskCategory::Coding,
    TaskCategory::Reasoning,
    TaskCategory::Multimodal,
];

/// Options for a single selection query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectOptions {
    /// Target context window in tokens. Defaults to the pool normalizer's
    /// context default.
    pub target_ctx: Option<u32>,
    pub top_n: usize,
    pub optimize_for: OptimizeFor,
    pub runtime: RuntimeKind,
    /// Clock input so reports are reproducible.
    pub now: DateTime<Utc>,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            target_ctx: None,
            top_n: defaults::TOP_N,
            optimize_for: OptimizeFor::Balanced,
            runtime: RuntimeKind::Ollama,
            now: Utc::now(),
        }
    }
}

/// Hardware header attached to selection reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareSummary {
    pub fingerprint: String,
    pub tier: HardwareTier,
    pub description: String,
    pub budget_gb: f64,
}

impl HardwareSummary {
    pub fn of(hardware: &HardwareProfile) -> Self {
        Self {
            fingerprint: hardware.fingerprint(),
            tier: hardware.tier(),
            description: hardware.description(),
            budget_gb: hardware.budget_gb(),
        }
    }
}

/// Result of one selection query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionReport {
    pub category: TaskCategory,
    pub optimize_for: OptimizeFor,
    pub hardware: HardwareSummary,
    pub candidates: Vec<Candidate>,
    pub total_evaluated: usize,
    pub timestamp: DateTime<Utc>,
}

/// The two-phase selector: pool in, ranked candidates out.
#[derive(Debug, Clone)]
pub struct Selector {
    hardware: HardwareProfile,
    pool: Vec<ModelVariant>,
}

impl Selector {
    pub fn new(hardware: HardwareProfile, pool: Vec<ModelVariant>) -> Self {
        Self { hardware, pool }
    }

    pub fn hardware(&self) -> &HardwareProfile {
        &self.hardware
    }

    pub fn pool(&self) -> &[ModelVariant] {
        &self.pool
    }

    /// Rank the (model, quantization) candidates for a category.
    pub fn select_models(&self, category: TaskCategory, options: &SelectOptions) -> SelectionReport {
        let budget = self.hardware.budget_gb();
        let eligible: Vec<&ModelVariant> = self
            .pool
            .iter()
            .filter(|v| category_filter(v, category))
            .collect();
        let total_evaluated = eligible.len();

        let mut evaluated: Vec<Candidate> = eligible
            .iter()
            .filter_map(|variant| self.evaluate_variant(variant, category, options))
            .collect();

        sort_candidates(&mut evaluated);

        let mut selected: Vec<Candidate> =
            evaluated.iter().take(options.top_n).cloned().collect();
        self.enforce_mid_tier(category, options, &mut selected, &evaluated);

        debug!(
            subsystem = "select",
            component = "pipeline",
            category = %category,
            objective = %options.optimize_for,
            budget_gb = budget,
            candidate_count = selected.len(),
            "selection complete"
        );

        SelectionReport {
            category,
            optimize_for: options.optimize_for,
            hardware: HardwareSummary::of(&self.hardware),
            candidates: selected,
            total_evaluated,
            timestamp: options.now,
        }
    }

    /// Evaluate one variant into a candidate, or drop it when no
    /// quantization fits or the context window is inadequate.
    pub fn evaluate_variant(
        &self,
        variant: &ModelVariant,
        category: TaskCategory,
        options: &SelectOptions,
    ) -> Option<Candidate> {
        let budget = self.hardware.budget_gb();
        let target_ctx = options.target_ctx.unwrap_or(defaults::CONTEXT_TOKENS);

        let c = context_score(variant.ctx_max, target_ctx)?;
        let (quant, required, _used_ctx) = choose_quant(variant, budget, target_ctx)?;
        let f = fit_score(required, budget)?;

        let tps = estimate_tps(&self.hardware, variant, quant, options.runtime);
        let s = speed_score(tps, category);
        let q = quality_prior(variant, quant, category);

        let components = Components { q, s, f, c };
        let weights = Weights::blended(category, options.optimize_for);
        let score = weights.combine(&components);

        let rationale = self.build_rationale(variant, quant, required, budget);

        trace!(
            subsystem = "select",
            component = "pipeline",
            model = %variant.identifier,
            quant = %quant,
            required_gb = required,
            tps,
            "candidate evaluated"
        );

        Some(Candidate {
            variant: variant.clone(),
            quant,
            required_gb: required,
            est_tps: tps,
            measured_tps: None,
            components,
            score,
            final_score: None,
            rationale,
        })
    }

    fn build_rationale(
        &self,
        variant: &ModelVariant,
        quant: Quant,
        required: f64,
        budget: f64,
    ) -> Vec<String> {
        let mut clauses = vec![
            format!("fits in {:.1}/{:.0} GB", required, budget),
            quant.as_str().to_string(),
        ];
        if variant.has_tag("coder")
            || variant.has_tag("code")
            || variant.name.to_lowercase().contains("code")
        {
            clauses.push("coder-tuned".to_string());
        }
        if variant.has_vision() {
            clauses.push("vision-capable".to_string());
        }
        if let Some(clause) = variant.freshness.rationale_clause() {
            clauses.push(clause.to_string());
        }
        if (7.0..=13.0).contains(&variant.params_b) {
            clauses.push(format!("{}B is sweet spot", trim_params(variant.params_b)));
        }
        clauses.push(self.hardware.backend().label().to_string());
        clauses
    }

    /// On capable machines, make sure at least one mid-tier model survives
    /// top-N truncation. Applied only when the caller did not ask for
    /// speed.
    fn enforce_mid_tier(
        &self,
        category: TaskCategory,
        options: &SelectOptions,
        selected: &mut Vec<Candidate>,
        evaluated: &[Candidate],
    ) {
        if !MID_TIER_CATEGORIES.contains(&category)
            || options.optimize_for == OptimizeFor::Speed
            || selected.is_empty()
        {
            return;
        }
        let budget = self.hardware.budget_gb();
        if budget < defaults::MID_TIER_BUDGET_GB {
            return;
        }
        let min_mid_tier = if budget >= 24.0 { 7.0 } else { 6.0 };
        if selected
            .iter()
            .any(|c| c.variant.params_b >= min_mid_tier)
        {
            return;
        }
        let speed_floor = if self.hardware.gpu.unified { 25.0 } else { 20.0 };

        let replacement = evaluated
            .iter()
            .filter(|c| c.variant.params_b >= min_mid_tier && c.components.s >= speed_floor)
            .find(|c| {
                !selected
                    .iter()
                    .any(|s| s.variant.identifier == c.variant.identifier)
            });

        if let Some(replacement) = replacement {
            debug!(
                subsystem = "select",
                component = "pipeline",
                model = %replacement.variant.identifier,
                "mid-tier coverage replacement applied"
            );
            let last = selected.len() - 1;
            selected[last] = replacement.clone();
            sort_candidates(selected);
        }
    }
}

/// Per-category eligibility predicate.
pub fn category_filter(variant: &ModelVariant, category: TaskCategory) -> bool {
    match category {
        TaskCategory::Coding => {
            variant.has_tag("coder")
                || variant.has_tag("code")
                || variant.has_tag("instruct")
                || variant.name.to_lowercase().contains("code")
        }
        TaskCategory::Multimodal => variant.has_vision(),
        TaskCategory::Embeddings => {
            let name = variant.name.to_lowercase();
            variant.has_tag("embedding")
                || name.contains("embed")
                || name.starts_with("bge-")
                || name.contains("nomic-embed")
                || name.contains("all-minilm")
        }
        TaskCategory::Reasoning => variant.has_tag("instruct") || variant.params_b >= 7.0,
        _ => true,
    }
}

/// Pick the first quantization, best quality first, whose requirement
/// fits the budget at the target context. If none fits, the context is
/// halved once (floored at the context floor) before the model is
/// rejected.
pub fn choose_quant(
    variant: &ModelVariant,
    budget_gb: f64,
    target_ctx: u32,
) -> Option<(Quant, f64, u32)> {
    let mut contexts = vec![target_ctx];
    let halved = (target_ctx / 2).max(defaults::CONTEXT_FLOOR_TOKENS);
    if halved < target_ctx {
        contexts.push(halved);
    }

    for ctx in contexts {
        for &quant in &variant.available_quantizations {
            let required = required_gb(variant, quant, ctx);
            if required <= budget_gb {
                return Some((quant, required, ctx));
            }
        }
    }
    None
}

/// Stable candidate ordering: score descending, then larger models, then
/// installed-first, then lexicographic identifier.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.effective_score()
            .partial_cmp(&a.effective_score())
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.variant
                    .params_b
                    .partial_cmp(&a.variant.params_b)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| b.variant.installed.cmp(&a.variant.installed))
            .then_with(|| a.variant.identifier.cmp(&b.variant.identifier))
    });
}

fn trim_params(params_b: f64) -> String {
    if (params_b.fract()).abs() < 1e-9 {
        format!("{:.0}", params_b)
    } else {
        format!("{:.1}", params_b)
    }
}
