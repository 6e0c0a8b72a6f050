//! Routing policy synthesis from a calibration result.
//!
//! Synthesis is deterministic: the same calibration result yields a
//! byte-identical policy. Ordering ties are broken lexicographically by
//! model identifier, and the policy's `generated_at` mirrors the source
//! result's so re-synthesis is idempotent.

use crate::result::{CalibrationResult, ModelStatus, Objective};
use chrono::{DateTime, Utc};
use llmrig_core::{defaults, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Route for one task: a primary model and up to two fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub primary: String,
    #[serde(default)]
    pub fallbacks: Vec<String>,
    pub min_quality: Option<f64>,
    pub rationale: Option<String>,
}

/// Provenance of a synthesized policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySource {
    pub calibration_version: String,
    pub calibration_result_path: Option<String>,
}

/// Optional context for consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyMetadata {
    pub runtime: Option<String>,
    pub hardware_fingerprint: Option<String>,
}

/// Schema-versioned routing policy artifact (YAML on disk).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPolicy {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub objective: Objective,
    pub source: PolicySource,
    pub routing: BTreeMap<String, RouteEntry>,
    pub metadata: PolicyMetadata,
}

impl CalibrationPolicy {
    /// Structural validation: schema version, non-empty primaries, no
    /// primary repeated among its own fallbacks.
    pub fn validate(&self) -> Result<()> {
        if self.schema_version != defaults::SCHEMA_VERSION {
            return Err(Error::InvalidInput(format!(
                "unsupported policy schema version: {}",
                self.schema_version
            )));
        }
        for (task, route) in &self.routing {
            if route.primary.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "route for task {} has an empty primary",
                    task
                )));
            }
            if route.fallbacks.contains(&route.primary) {
                return Err(Error::InvalidInput(format!(
                    "route for task {} lists its primary among fallbacks",
                    task
                )));
            }
            if route.fallbacks.len() > 2 {
                return Err(Error::InvalidInput(format!(
                    "route for task {} has more than two fallbacks",
                    task
                )));
            }
        }
        Ok(())
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Parse from YAML.
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Write the YAML artifact to disk. Refuses directories.
    pub fn write_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.is_dir() {
            return Err(Error::Artifact(format!(
                "output path is a directory: {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_yaml()?)
            .map_err(|e| Error::Artifact(format!("cannot write {}: {}", path.display(), e)))
    }
}

/// Synthesize a routing policy from a calibration result.
///
/// For each task in the suite: successful models with that task's score at
/// or above `min_quality` are sorted by objective (speed by throughput,
/// quality by overall score, balanced by an even blend with throughput
/// normalized against the fastest eligible model), ties broken by
/// identifier. First becomes the primary; the next two the fallbacks.
pub fn synthesize_policy(
    result: &CalibrationResult,
    min_quality: f64,
    result_path: Option<&str>,
) -> CalibrationPolicy {
    let mut routing = BTreeMap::new();

    let max_tps = result
        .models
        .iter()
        .filter(|m| m.status == ModelStatus::Success)
        .filter_map(|m| m.metrics.as_ref().map(|metrics| metrics.tokens_per_second))
        .fold(0.0_f64, f64::max);

    for task in result.suite.task_breakdown.keys() {
        let mut eligible: Vec<(&str, f64, f64)> = result
            .models
            .iter()
            .filter(|m| m.status == ModelStatus::Success)
            .filter_map(|m| {
                let quality = m.quality.as_ref()?;
                let task_score = *quality.task_scores.get(task)?;
                if task_score < min_quality {
                    return None;
                }
                let tps = m
                    .metrics
                    .as_ref()
                    .map(|metrics| metrics.tokens_per_second)
                    .unwrap_or(0.0);
                Some((m.model_identifier.as_str(), quality.overall_score, tps))
            })
            .collect();

        let rank = |quality: f64, tps: f64| -> f64 {
            match result.objective {
                Objective::Speed => tps,
                Objective::Quality => quality,
                Objective::Balanced => {
                    let speed_normalized = if max_tps > 0.0 { tps / max_tps * 100.0 } else { 0.0 };
                    0.5 * quality + 0.5 * speed_normalized
                }
            }
        };

        eligible.sort_by(|a, b| {
            rank(b.1, b.2)
                .partial_cmp(&rank(a.1, a.2))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });

        let Some((primary, _, _)) = eligible.first().copied() else {
            debug!(
                subsystem = "calibrate",
                component = "policy",
                category = %task,
                "no model met the quality bar for this task"
            );
            continue;
        };

        routing.insert(
            task.clone(),
            RouteEntry {
                primary: primary.to_string(),
                fallbacks: eligible
                    .iter()
                    .skip(1)
                    .take(2)
                    .map(|(id, _, _)| id.to_string())
                    .collect(),
                min_quality: Some(min_quality),
                rationale: Some(format!(
                    "ranked by {} among {} eligible models",
                    result.objective,
                    eligible.len()
                )),
            },
        );
    }

    CalibrationPolicy {
        schema_version: defaults::SCHEMA_VERSION.to_string(),
        // Mirror the source timestamp so synthesis is idempotent.
        generated_at: result.generated_at,
        objective: result.objective,
        source: PolicySource {
            calibration_version: result.calibration_version.clone(),
            calibration_result_path: result_path.map(str::to_string),
        },
        routing,
        metadata: PolicyMetadata {
            runtime: Some(result.runtime.to_string()),
            hardware_fingerprint: Some(result.hardware.fingerprint.clone()),
        },
    }
}
