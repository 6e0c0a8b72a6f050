//! # llmrig-probe
//!
//! Ollama runtime client, probe executor, and probe cache for llmrig.
//!
//! This crate provides:
//! - The [`OllamaRuntime`] executor over the daemon's HTTP API
//! - The probe phase that validates estimated speed with short live
//!   generations
//! - The hardware-fingerprinted, TTL-bounded probe cache
//! - A scripted [`mock::MockRuntime`] for deterministic tests

pub mod cache;
pub mod mock;
pub mod ollama;
pub mod probe;

pub use cache::{ProbeCache, ProbeCacheEntry};
pub use mock::MockRuntime;
pub use ollama::{OllamaRuntime, DEFAULT_OLLAMA_URL};
pub use probe::{probe_candidates, select_and_probe, ProbeOptions};
