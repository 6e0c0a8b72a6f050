//! Persisted probe result cache.
//!
//! A single-writer JSON map keyed by `"{fingerprint}_{model}@{quant}"`.
//! Entries carry measured tokens/sec and expire after a fixed TTL.
//! Persistence is atomic: write to a temp file in the same directory, then
//! rename over the target.

use llmrig_core::{defaults, Quant, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Entry TTL in milliseconds.
const TTL_MS: i64 = defaults::PROBE_TTL_DAYS * 24 * 60 * 60 * 1000;

/// One cached probe measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeCacheEntry {
    /// Measured tokens per second.
    pub tps: f64,
    /// Measurement time in epoch milliseconds.
    pub timestamp: i64,
    /// Category the probe prompt belonged to.
    pub category: String,
}

impl ProbeCacheEntry {
    /// Entry validity against the TTL.
    pub fn is_valid(&self, now_ms: i64) -> bool {
        now_ms - self.timestamp < TTL_MS
    }
}

/// Hardware-fingerprinted, TTL-bounded probe cache.
#[derive(Debug)]
pub struct ProbeCache {
    path: PathBuf,
    entries: BTreeMap<String, ProbeCacheEntry>,
}

impl ProbeCache {
    /// Default per-user cache path (`~/.llmrig/bench.json`), when a home
    /// directory is resolvable.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(defaults::PROBE_CACHE_REL_PATH))
    }

    /// Load the cache from disk. A missing file yields an empty cache; a
    /// corrupt file is discarded with a warning rather than failing the
    /// pipeline.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        subsystem = "probe",
                        component = "cache",
                        error = %e,
                        "probe cache unreadable, starting fresh"
                    );
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    /// In-memory cache for tests and probe-less runs.
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            entries: BTreeMap::new(),
        }
    }

    /// Cache key for a (hardware, model, quant) triple.
    pub fn key(fingerprint: &str, model_identifier: &str, quant: Quant) -> String {
        format!("{}_{}@{}", fingerprint, model_identifier, quant)
    }

    /// Entry for the key, when present and inside the TTL.
    pub fn get_valid(&self, key: &str, now_ms: i64) -> Option<&ProbeCacheEntry> {
        self.entries.get(key).filter(|entry| entry.is_valid(now_ms))
    }

    /// Insert or replace an entry.
    pub fn upsert(&mut self, key: String, entry: ProbeCacheEntry) {
        self.entries.insert(key, entry);
    }

    /// Drop entries past the TTL. Returns how many were removed.
    pub fn prune_expired(&mut self, now_ms: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_valid(now_ms));
        before - self.entries.len()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Atomically persist the cache: temp file plus rename. A cache with
    /// no backing path (in-memory) is a no-op.
    pub fn persist(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = temp_sibling(&self.path);
        let payload = serde_json::to_vec_pretty(&self.entries)?;
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &self.path)?;
        debug!(
            subsystem = "probe",
            component = "cache",
            candidate_count = self.entries.len(),
            "probe cache persisted"
        );
        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "bench.json".into());
    file_name.push(".tmp");
    path.with_file_name(file_name)
}
