//! llmrig Calibration Runner
//!
//! Run a prompt-suite calibration against a local inference daemon and
//! optionally synthesize a routing policy from the result.
//!
//! Usage:
//!   cargo run --bin llmrig-calibrate -- --suite suites/core.jsonl --models qwen2.5:7b
//!   cargo run --bin llmrig-calibrate -- --suite suites/core.jsonl --models qwen2.5:7b,llama3.1:8b --mode full --policy-out policy.yaml
//!   cargo run --bin llmrig-calibrate -- --suite suites/core.jsonl --models qwen2.5:7b --mode dry-run --output result.json

use llmrig_calibrate::{
    calibrate, synthesize_policy, CalibrateOptions, ExecutionMode, Objective, PromptSuite,
};
use llmrig_core::{defaults, HardwareProfile, RuntimeExecutor, RuntimeKind};
use llmrig_probe::OllamaRuntime;
use std::env;
use std::path::PathBuf;

#[derive(Debug)]
struct Args {
    suite: Option<PathBuf>,
    models: Vec<String>,
    mode: ExecutionMode,
    objective: Objective,
    runtime: RuntimeKind,
    warmup_runs: u32,
    measured_iterations: u32,
    timeout_ms: u64,
    min_quality: f64,
    hardware: Option<PathBuf>,
    output: PathBuf,
    policy_out: Option<PathBuf>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            suite: None,
            models: Vec::new(),
            mode: ExecutionMode::Full,
            objective: Objective::Balanced,
            runtime: RuntimeKind::Ollama,
            warmup_runs: defaults::WARMUP_RUNS,
            measured_iterations: defaults::MEASURED_ITERATIONS,
            timeout_ms: defaults::REQUEST_TIMEOUT_SECS * 1000,
            min_quality: defaults::POLICY_MIN_QUALITY,
            hardware: None,
            output: PathBuf::from("calibration-result.json"),
            policy_out: None,
        }
    }
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut result = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--suite" | "-s" => {
                i += 1;
                result.suite = args.get(i).map(PathBuf::from);
            }
            "--models" | "-m" => {
                i += 1;
                if let Some(list) = args.get(i) {
                    result.models = list
                        .split(',')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(str::to_string)
                        .collect();
                }
            }
            "--mode" => {
                i += 1;
                let value = args.get(i).ok_or("--mode requires a value")?;
                result.mode = value.parse().map_err(|e| format!("{}", e))?;
            }
            "--objective" => {
                i += 1;
                let value = args.get(i).ok_or("--objective requires a value")?;
                result.objective = value.parse().map_err(|e| format!("{}", e))?;
            }
            "--runtime" => {
                i += 1;
                let value = args.get(i).ok_or("--runtime requires a value")?;
                result.runtime = value.parse().map_err(|e| format!("{}", e))?;
            }
            "--warmup" => {
                i += 1;
                let value = args.get(i).ok_or("--warmup requires a value")?;
                result.warmup_runs = value.parse().map_err(|_| "invalid --warmup value")?;
            }
            "--iterations" | "-i" => {
                i += 1;
                let value = args.get(i).ok_or("--iterations requires a value")?;
                result.measured_iterations =
                    value.parse().map_err(|_| "invalid --iterations value")?;
            }
            "--timeout-ms" => {
                i += 1;
                let value = args.get(i).ok_or("--timeout-ms requires a value")?;
                result.timeout_ms = value.parse().map_err(|_| "invalid --timeout-ms value")?;
            }
            "--min-quality" => {
                i += 1;
                let value = args.get(i).ok_or("--min-quality requires a value")?;
                result.min_quality = value.parse().map_err(|_| "invalid --min-quality value")?;
            }
            "--hardware" => {
                i += 1;
                result.hardware = args.get(i).map(PathBuf::from);
            }
            "--output" | "-o" => {
                i += 1;
                if let Some(path) = args.get(i) {
                    result.output = PathBuf::from(path);
                }
            }
            "--policy-out" | "-p" => {
                i += 1;
                result.policy_out = args.get(i).map(PathBuf::from);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => return Err(format!("unknown flag: {}", other)),
        }
        i += 1;
    }

    Ok(result)
}

fn print_help() {
    println!(
        r#"
llmrig Calibration Runner

Usage: cargo run --bin llmrig-calibrate -- [OPTIONS]

Options:
  -s, --suite <PATH>        Prompt suite (line-delimited JSON), required
  -m, --models <LIST>       Comma-separated model identifiers, required
      --mode <MODE>         dry-run, contract-only, full (default: full)
      --objective <OBJ>     speed, quality, balanced (default: balanced)
      --runtime <RUNTIME>   ollama, vllm, mlx, llama.cpp (default: ollama)
      --warmup <N>          Warmup iterations per prompt (default: 1)
  -i, --iterations <N>      Measured iterations per prompt (default: 1)
      --timeout-ms <MS>     Per-request timeout (default: 30000)
      --min-quality <SCORE> Per-task routing quality floor (default: 50)
      --hardware <PATH>     Hardware descriptor JSON (default: built-in)
  -o, --output <PATH>       Result artifact path (default: calibration-result.json)
  -p, --policy-out <PATH>   Also synthesize a routing policy YAML
  -h, --help                Print help

Environment Variables:
  LLMRIG_OLLAMA_URL   Ollama daemon URL (default: http://localhost:11434)
  RUST_LOG            Log filter (e.g. llmrig_calibrate=debug)

Examples:
  cargo run --bin llmrig-calibrate -- -s suites/core.jsonl -m qwen2.5:7b
  cargo run --bin llmrig-calibrate -- -s suites/core.jsonl -m qwen2.5:7b,llama3.1:8b -i 3 -p policy.yaml
  cargo run --bin llmrig-calibrate -- -s suites/core.jsonl -m qwen2.5:7b --mode dry-run
"#
    );
}

fn load_hardware(path: Option<&PathBuf>) -> Result<HardwareProfile, String> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read hardware descriptor {}: {}", path.display(), e))?;
            let value: serde_json::Value = serde_json::from_str(&raw)
                .map_err(|e| format!("invalid hardware descriptor {}: {}", path.display(), e))?;
            Ok(HardwareProfile::normalize(&value))
        }
        None => Ok(HardwareProfile::default()),
    }
}

async fn run() -> Result<(), String> {
    let args = parse_args()?;

    let suite_path = args.suite.as_ref().ok_or("--suite is required")?;
    if args.models.is_empty() {
        return Err("--models is required".to_string());
    }

    let suite = PromptSuite::parse_path(suite_path).map_err(|e| e.to_string())?;
    let hardware = load_hardware(args.hardware.as_ref())?;

    println!("═══════════════════════════════════════════════════════════════");
    println!("llmrig Calibration Runner");
    println!("═══════════════════════════════════════════════════════════════");
    println!("Suite:     {} ({} prompts)", suite.path, suite.prompts.len());
    println!("Models:    {}", args.models.join(", "));
    println!("Mode:      {}", args.mode);
    println!("Objective: {}", args.objective);
    println!("Hardware:  {}", hardware.description());
    println!();

    let runtime;
    let executor: Option<&dyn RuntimeExecutor> = if args.mode == ExecutionMode::Full {
        runtime = OllamaRuntime::from_env();
        Some(&runtime)
    } else {
        None
    };

    let options = CalibrateOptions {
        runtime: args.runtime,
        objective: args.objective,
        mode: args.mode,
        warmup_runs: args.warmup_runs,
        measured_iterations: args.measured_iterations,
        timeout_ms: args.timeout_ms,
        ..Default::default()
    };

    let result = calibrate(&suite, &args.models, executor, &hardware, &options)
        .await
        .map_err(|e| e.to_string())?;

    result.write_json(&args.output).map_err(|e| e.to_string())?;
    println!("Result written to {}", args.output.display());
    println!(
        "Summary: {} total / {} successful / {} failed / {} skipped / {} pending",
        result.summary.total,
        result.summary.successful,
        result.summary.failed,
        result.summary.skipped,
        result.summary.pending
    );

    for model in &result.models {
        match (&model.metrics, &model.error) {
            (Some(metrics), _) => println!(
                "  {:<32} {:>6.1} tok/s  p50 {:>5.0}ms  p95 {:>5.0}ms",
                model.model_identifier,
                metrics.tokens_per_second,
                metrics.latency_ms_p50,
                metrics.latency_ms_p95
            ),
            (None, Some(error)) => {
                println!("  {:<32} FAILED: {}", model.model_identifier, error)
            }
            (None, None) => println!("  {:<32} {:?}", model.model_identifier, model.status),
        }
    }

    if let Some(policy_out) = &args.policy_out {
        let policy = synthesize_policy(
            &result,
            args.min_quality,
            Some(&args.output.display().to_string()),
        );
        policy.validate().map_err(|e| e.to_string())?;
        policy.write_yaml(policy_out).map_err(|e| e.to_string())?;
        println!("Policy written to {}", policy_out.display());
        for (task, route) in &policy.routing {
            println!("  {:<16} -> {}", task, route.primary);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(message) = run().await {
        eprintln!("error: {}", message);
        std::process::exit(1);
    }
}
