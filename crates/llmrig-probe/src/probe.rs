//! Probe phase: replace estimated speed with measured speed.
//!
//! Probes run sequentially against the single local daemon to avoid
//! self-contention. Cache hits do not touch the daemon at all. A probe
//! failure is recoverable per candidate: the candidate keeps its estimated
//! speed score and the batch continues. The cache is persisted after every
//! fresh measurement so a cancelled run keeps its partial results.

use crate::cache::{ProbeCache, ProbeCacheEntry};
use llmrig_core::{
    defaults, Candidate, GenerationOptions, HardwareProfile, RuntimeExecutor,
};
use llmrig_select::{
    sort_candidates, speed_score, OptimizeFor, SelectOptions, SelectionReport, Selector,
    TaskCategory, Weights,
};
use tracing::{debug, info, warn};

/// Options for the probe phase.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Token cap per probe generation.
    pub num_predict: u32,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout_ms: defaults::REQUEST_TIMEOUT_SECS * 1000,
            num_predict: defaults::PROBE_NUM_PREDICT,
        }
    }
}

/// Probe the candidates in place, replacing the S component with measured
/// throughput and recomputing the final score. Returns how many fresh
/// (non-cached) probes ran.
#[allow(clippy::too_many_arguments)]
pub async fn probe_candidates<R: RuntimeExecutor + ?Sized>(
    runtime: &R,
    cache: &mut ProbeCache,
    hardware: &HardwareProfile,
    category: TaskCategory,
    optimize_for: OptimizeFor,
    candidates: &mut Vec<Candidate>,
    now_ms: i64,
    options: &ProbeOptions,
) -> usize {
    let fingerprint = hardware.fingerprint();
    let weights = Weights::blended(category, optimize_for);
    let mut fresh_probes = 0;

    for candidate in candidates.iter_mut() {
        let key = ProbeCache::key(&fingerprint, &candidate.variant.identifier, candidate.quant);

        let tps = if let Some(entry) = cache.get_valid(&key, now_ms) {
            debug!(
                subsystem = "probe",
                component = "executor",
                model = %candidate.variant.identifier,
                cache_hit = true,
                tps = entry.tps,
                "using cached probe result"
            );
            Some(entry.tps)
        } else {
            let generation_options = GenerationOptions {
                num_predict: Some(options.num_predict),
                timeout_ms: Some(options.timeout_ms),
            };
            match runtime
                .generate(
                    &candidate.variant.identifier,
                    category.probe_prompt(),
                    &generation_options,
                )
                .await
            {
                Ok(run) => {
                    let tps = run.tokens_per_second(defaults::TOKENS_PER_WORD);
                    fresh_probes += 1;
                    cache.upsert(
                        key,
                        ProbeCacheEntry {
                            tps,
                            timestamp: now_ms,
                            category: category.to_string(),
                        },
                    );
                    // Flush after every fresh measurement so cancellation
                    // keeps partial results.
                    if let Err(e) = cache.persist() {
                        warn!(
                            subsystem = "probe",
                            component = "cache",
                            error = %e,
                            "failed to persist probe cache"
                        );
                    }
                    info!(
                        subsystem = "probe",
                        component = "executor",
                        model = %candidate.variant.identifier,
                        tps,
                        duration_ms = run.latency_ms,
                        "probe complete"
                    );
                    Some(tps)
                }
                Err(e) => {
                    warn!(
                        subsystem = "probe",
                        component = "executor",
                        model = %candidate.variant.identifier,
                        error = %e,
                        "probe failed, keeping estimated speed"
                    );
                    None
                }
            }
        };

        if let Some(tps) = tps {
            candidate.measured_tps = Some(tps);
            candidate.components.s = speed_score(tps, category);
            candidate.final_score = Some(weights.combine(&candidate.components));
        }
    }

    sort_candidates(candidates);
    fresh_probes
}

/// Selection with the probe phase enabled: rank candidates, then validate
/// the top picks against the live daemon and re-rank on measured speed.
pub async fn select_and_probe<R: RuntimeExecutor + ?Sized>(
    selector: &Selector,
    category: TaskCategory,
    select_options: &SelectOptions,
    runtime: &R,
    cache: &mut ProbeCache,
    now_ms: i64,
    probe_options: &ProbeOptions,
) -> SelectionReport {
    let mut report = selector.select_models(category, select_options);
    probe_candidates(
        runtime,
        cache,
        selector.hardware(),
        category,
        select_options.optimize_for,
        &mut report.candidates,
        now_ms,
        probe_options,
    )
    .await;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRuntime;
    use llmrig_core::{Components, ModelVariant, Quant};
    use serde_json::json;

    const NOW_MS: i64 = 1_750_000_000_000;

    fn hardware() -> HardwareProfile {
        HardwareProfile::normalize(&json!({
            "cpu": {"architecture": "x86_64", "cores": 16},
            "memory": {"totalGB": 64},
            "gpu": {"model": "NVIDIA RTX 3090", "vramGB": 24}
        }))
    }

    fn candidate(identifier: &str, est_tps: f64, score: f64) -> Candidate {
        Candidate {
            variant: ModelVariant::new(identifier, 7.0, 32_768),
            quant: Quant::Q4_K_M,
            required_gb: 5.0,
            est_tps,
            measured_tps: None,
            components: Components {
                q: 75.0,
                s: speed_score(est_tps, TaskCategory::General),
                f: 100.0,
                c: 100.0,
            },
            score,
            final_score: None,
            rationale: vec![],
        }
    }

    #[tokio::test]
    async fn test_probe_replaces_speed_and_rescores() {
        // 26 words -> 33.8 tokens over 1s -> measured 33.8 t/s.
        let output = (0..26).map(|_| "word").collect::<Vec<_>>().join(" ");
        let runtime = MockRuntime::new().with_run(&output, 1000, Some(50));
        let mut cache = ProbeCache::in_memory();
        let mut candidates = vec![candidate("qwen2.5:7b", 20.0, 70.0)];

        let fresh = probe_candidates(
            &runtime,
            &mut cache,
            &hardware(),
            TaskCategory::General,
            OptimizeFor::Balanced,
            &mut candidates,
            NOW_MS,
            &ProbeOptions::default(),
        )
        .await;

        assert_eq!(fresh, 1);
        let probed = &candidates[0];
        let measured = probed.measured_tps.unwrap();
        assert!((measured - 33.8).abs() < 0.1);
        assert_eq!(probed.components.s, speed_score(measured, TaskCategory::General));
        assert!(probed.final_score.is_some());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_probe_prefers_true_token_counts() {
        let runtime = MockRuntime::new().with_counted_run("short", 2000, 100, 1000);
        let mut cache = ProbeCache::in_memory();
        let mut candidates = vec![candidate("qwen2.5:7b", 20.0, 70.0)];

        probe_candidates(
            &runtime,
            &mut cache,
            &hardware(),
            TaskCategory::General,
            OptimizeFor::Balanced,
            &mut candidates,
            NOW_MS,
            &ProbeOptions::default(),
        )
        .await;

        // 100 tokens over 1000ms of eval time, not wall clock.
        assert!((candidates[0].measured_tps.unwrap() - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_daemon() {
        let runtime = MockRuntime::new(); // would fail if called: no scripted runs
        let mut cache = ProbeCache::in_memory();
        let fingerprint = hardware().fingerprint();
        cache.upsert(
            ProbeCache::key(&fingerprint, "qwen2.5:7b", Quant::Q4_K_M),
            ProbeCacheEntry {
                tps: 55.0,
                timestamp: NOW_MS - 1000,
                category: "general".to_string(),
            },
        );
        let mut candidates = vec![candidate("qwen2.5:7b", 20.0, 70.0)];

        let fresh = probe_candidates(
            &runtime,
            &mut cache,
            &hardware(),
            TaskCategory::General,
            OptimizeFor::Balanced,
            &mut candidates,
            NOW_MS,
            &ProbeOptions::default(),
        )
        .await;

        assert_eq!(fresh, 0);
        assert_eq!(runtime.calls(), 0);
        assert_eq!(candidates[0].measured_tps, Some(55.0));
    }

    #[tokio::test]
    async fn test_probe_failure_keeps_estimate() {
        let runtime = MockRuntime::new()
            .with_failure("model not loaded")
            .with_run("three word reply", 1000, None);
        let mut cache = ProbeCache::in_memory();
        let mut candidates = vec![
            candidate("broken:7b", 20.0, 70.0),
            candidate("healthy:7b", 20.0, 69.0),
        ];

        let fresh = probe_candidates(
            &runtime,
            &mut cache,
            &hardware(),
            TaskCategory::General,
            OptimizeFor::Balanced,
            &mut candidates,
            NOW_MS,
            &ProbeOptions::default(),
        )
        .await;

        // One probe failed, one succeeded; the batch never fails.
        assert_eq!(fresh, 1);
        let broken = candidates
            .iter()
            .find(|c| c.variant.identifier == "broken:7b")
            .unwrap();
        assert!(broken.measured_tps.is_none());
        assert!(broken.final_score.is_none());

        let healthy = candidates
            .iter()
            .find(|c| c.variant.identifier == "healthy:7b")
            .unwrap();
        assert!(healthy.measured_tps.is_some());
    }

    #[tokio::test]
    async fn test_probes_run_sequentially_in_order() {
        let runtime = MockRuntime::new()
            .with_run("a a a", 500, None)
            .with_run("b b b", 500, None);
        let mut cache = ProbeCache::in_memory();
        let mut candidates = vec![
            candidate("first:7b", 20.0, 80.0),
            candidate("second:7b", 20.0, 70.0),
        ];

        probe_candidates(
            &runtime,
            &mut cache,
            &hardware(),
            TaskCategory::General,
            OptimizeFor::Balanced,
            &mut candidates,
            NOW_MS,
            &ProbeOptions::default(),
        )
        .await;

        let log = runtime.call_log();
        assert_eq!(log, vec!["first:7b".to_string(), "second:7b".to_string()]);
    }
}
