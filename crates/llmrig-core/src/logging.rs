//! Structured logging schema and field name constants for llmrig.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration (per-candidate scoring, per-prompt runs) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "select", "probe", "calibrate", "core"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "scoring", "ollama", "cache", "suite"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "select_models", "probe", "calibrate", "generate"
pub const OPERATION: &str = "op";

// ─── Selection fields ──────────────────────────────────────────────────────

/// Model identifier being evaluated or executed.
pub const MODEL: &str = "model";

/// Task category being selected for.
pub const CATEGORY: &str = "category";

/// Chosen quantization level.
pub const QUANT: &str = "quant";

/// Active optimization objective.
pub const OBJECTIVE: &str = "objective";

/// Inference runtime in use.
pub const RUNTIME: &str = "runtime";

/// Estimated memory requirement in GB.
pub const REQUIRED_GB: &str = "required_gb";

/// Memory budget in GB.
pub const BUDGET_GB: &str = "budget_gb";

/// Number of candidates produced or evaluated.
pub const CANDIDATE_COUNT: &str = "candidate_count";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Tokens per second, estimated or measured.
pub const TPS: &str = "tps";

/// Time to first token in milliseconds.
pub const TTFT_MS: &str = "ttft_ms";

// ─── Probe cache fields ────────────────────────────────────────────────────

/// Hardware fingerprint used as a cache key component.
pub const FINGERPRINT: &str = "fingerprint";

/// Whether a probe result came from the cache.
pub const CACHE_HIT: &str = "cache_hit";

// ─── Calibration fields ────────────────────────────────────────────────────

/// Prompt suite path.
pub const SUITE_PATH: &str = "suite_path";

/// Prompt identifier within a suite.
pub const PROMPT_ID: &str = "prompt_id";

/// Measured iteration index.
pub const ITERATION: &str = "iteration";

/// Per-model calibration status.
pub const STATUS: &str = "status";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";
