//! Calibration execution: warmup and measured iterations per model, with
//! per-model failure isolation.
//!
//! Models run sequentially for reproducibility and to avoid contending
//! with ourselves on a single local daemon. One model failing (timeout,
//! non-OK response, parse error) marks that model `failed` and the run
//! continues; an artifact is emitted in every mode.

use crate::aggregate::{mean, median, nearest_rank_percentile};
use crate::checks::pass_rate;
use crate::result::{
    CalibrationHardware, CalibrationResult, CalibrationSummary, ExecutionMode, ModelCalibration,
    ModelMetrics, ModelQuality, ModelStatus, ModelTraces, Objective, PromptRunTrace, SuiteInfo,
};
use crate::suite::PromptSuite;
use chrono::{DateTime, Utc};
use llmrig_core::{
    defaults, Error, GenerationOptions, HardwareProfile, Result, RuntimeExecutor, RuntimeKind,
};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Options for a calibration run.
#[derive(Debug, Clone)]
pub struct CalibrateOptions {
    pub runtime: RuntimeKind,
    pub objective: Objective,
    pub mode: ExecutionMode,
    pub warmup_runs: u32,
    pub measured_iterations: u32,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Clock input so artifacts are reproducible.
    pub now: DateTime<Utc>,
}

impl Default for CalibrateOptions {
    fn default() -> Self {
        Self {
            runtime: RuntimeKind::Ollama,
            objective: Objective::Balanced,
            mode: ExecutionMode::Full,
            warmup_runs: defaults::WARMUP_RUNS,
            measured_iterations: defaults::MEASURED_ITERATIONS,
            timeout_ms: defaults::REQUEST_TIMEOUT_SECS * 1000,
            now: Utc::now(),
        }
    }
}

/// Run calibration over the suite for the named models.
///
/// `executor` may be `None` for dry-run and contract-only modes, which
/// never dispatch. Full mode requires an executor and currently supports
/// the Ollama runtime only.
pub async fn calibrate(
    suite: &PromptSuite,
    models: &[String],
    executor: Option<&dyn RuntimeExecutor>,
    hardware: &HardwareProfile,
    options: &CalibrateOptions,
) -> Result<CalibrationResult> {
    if models.is_empty() {
        return Err(Error::InvalidInput(
            "calibration requires at least one model".to_string(),
        ));
    }
    if options.measured_iterations == 0 {
        return Err(Error::InvalidInput(
            "measured_iterations must be at least 1".to_string(),
        ));
    }

    let model_records = match options.mode {
        ExecutionMode::DryRun | ExecutionMode::ContractOnly => models
            .iter()
            .map(|model| ModelCalibration {
                model_identifier: model.clone(),
                status: ModelStatus::Pending,
                metrics: None,
                quality: None,
                traces: ModelTraces {
                    warmup_runs: options.warmup_runs,
                    measured_iterations: options.measured_iterations,
                    prompt_runs: Vec::new(),
                    error_code: None,
                },
                error: None,
            })
            .collect(),
        ExecutionMode::Full => {
            if options.runtime != RuntimeKind::Ollama {
                return Err(Error::UnsupportedRuntime(format!(
                    "Full calibration mode currently supports the {} runtime; got {}",
                    RuntimeKind::Ollama,
                    options.runtime
                )));
            }
            let executor = executor.ok_or_else(|| {
                Error::Config("full calibration mode requires a runtime executor".to_string())
            })?;
            run_all_models(suite, models, executor, options).await
        }
    };

    let summary = CalibrationSummary::from_models(&model_records);
    let result = CalibrationResult {
        schema_version: defaults::SCHEMA_VERSION.to_string(),
        generated_at: options.now,
        calibration_version: env!("CARGO_PKG_VERSION").to_string(),
        execution_mode: options.mode,
        runtime: options.runtime,
        objective: options.objective,
        hardware: CalibrationHardware {
            fingerprint: hardware.fingerprint(),
            description: hardware.description(),
        },
        suite: SuiteInfo {
            path: suite.path.clone(),
            total_prompts: suite.prompts.len(),
            task_breakdown: suite.task_breakdown(),
        },
        models: model_records,
        summary,
    };

    info!(
        subsystem = "calibrate",
        component = "manager",
        suite_path = %result.suite.path,
        status = %format!(
            "{}/{} successful",
            result.summary.successful, result.summary.total
        ),
        "calibration complete"
    );

    Ok(result)
}

async fn run_all_models(
    suite: &PromptSuite,
    models: &[String],
    executor: &dyn RuntimeExecutor,
    options: &CalibrateOptions,
) -> Vec<ModelCalibration> {
    let mut records = Vec::with_capacity(models.len());

    // Sequential by design: one daemon, reproducible ordering, and a
    // failure in one model must not poison another.
    for model in models {
        let record = match run_model(suite, model, executor, options).await {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    subsystem = "calibrate",
                    component = "manager",
                    model = %model,
                    error = %e,
                    "model calibration failed"
                );
                ModelCalibration {
                    model_identifier: model.clone(),
                    status: ModelStatus::Failed,
                    metrics: None,
                    quality: None,
                    traces: ModelTraces {
                        warmup_runs: options.warmup_runs,
                        measured_iterations: options.measured_iterations,
                        prompt_runs: Vec::new(),
                        error_code: Some(e.code().to_string()),
                    },
                    error: Some(e.to_string()),
                }
            }
        };
        records.push(record);
    }

    records
}

async fn run_model(
    suite: &PromptSuite,
    model: &str,
    executor: &dyn RuntimeExecutor,
    options: &CalibrateOptions,
) -> Result<ModelCalibration> {
    let generation_options = GenerationOptions {
        num_predict: None,
        timeout_ms: Some(options.timeout_ms),
    };

    let mut latencies: Vec<u64> = Vec::new();
    let mut ttfts: Vec<u64> = Vec::new();
    let mut total_tokens = 0.0;
    let mut prompt_runs = Vec::new();
    // Per-prompt mean pass rate, grouped by task.
    let mut task_prompt_rates: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for prompt in &suite.prompts {
        for _ in 0..options.warmup_runs {
            // Warmup results are discarded, but a throwing warmup still
            // fails the model.
            executor
                .generate(model, &prompt.prompt, &generation_options)
                .await?;
        }

        let mut iteration_rates = Vec::new();
        for iteration in 1..=options.measured_iterations {
            let run = executor
                .generate(model, &prompt.prompt, &generation_options)
                .await?;

            let rate = pass_rate(&prompt.checks, &run.output);
            let tokens = run.token_count(defaults::TOKENS_PER_WORD);

            latencies.push(run.latency_ms);
            if let Some(ttft) = run.ttft_ms {
                ttfts.push(ttft);
            }
            total_tokens += tokens;
            iteration_rates.push(rate);
            prompt_runs.push(PromptRunTrace {
                prompt_id: prompt.id.clone(),
                iteration,
                latency_ms: run.latency_ms,
                ttft_ms: run.ttft_ms,
                output_tokens: tokens,
                pass_rate: rate,
            });
        }

        task_prompt_rates
            .entry(prompt.task.clone())
            .or_default()
            .push(mean(&iteration_rates));
    }

    let total_latency_secs: f64 = latencies.iter().sum::<u64>() as f64 / 1000.0;
    let tokens_per_second = if total_latency_secs > 0.0 {
        total_tokens / total_latency_secs
    } else {
        0.0
    };

    let task_scores: BTreeMap<String, f64> = task_prompt_rates
        .iter()
        .map(|(task, rates)| (task.clone(), mean(rates) * 100.0))
        .collect();
    let overall_score = mean(&task_scores.values().copied().collect::<Vec<_>>());
    let all_prompt_rates: Vec<f64> = task_prompt_rates.values().flatten().copied().collect();
    let check_pass_rate = mean(&all_prompt_rates);

    Ok(ModelCalibration {
        model_identifier: model.to_string(),
        status: ModelStatus::Success,
        metrics: Some(ModelMetrics {
            ttft_ms: median(&ttfts),
            tokens_per_second,
            latency_ms_p50: nearest_rank_percentile(&latencies, 0.50) as f64,
            latency_ms_p95: nearest_rank_percentile(&latencies, 0.95) as f64,
            peak_memory_mb: 0.0,
        }),
        quality: Some(ModelQuality {
            overall_score,
            task_scores,
            check_pass_rate,
        }),
        traces: ModelTraces {
            warmup_runs: options.warmup_runs,
            measured_iterations: options.measured_iterations,
            prompt_runs,
            error_code: None,
        },
        error: None,
    })
}
