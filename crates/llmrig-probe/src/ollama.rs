//! Ollama daemon client implementing the runtime executor seam.

use async_trait::async_trait;
use llmrig_core::{
    defaults, Error, GenerationOptions, GenerationRun, InstalledModelDescriptor, Result,
    RuntimeExecutor, RuntimeKind,
};
use llmrig_select::parse_params_b;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = defaults::OLLAMA_URL;

/// Ollama runtime executor over the daemon's HTTP API.
pub struct OllamaRuntime {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl OllamaRuntime {
    /// Create a runtime against the default endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_OLLAMA_URL.to_string())
    }

    /// Create a runtime against a specific endpoint.
    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            subsystem = "probe",
            component = "ollama",
            "Initializing Ollama runtime: url={}",
            base_url
        );

        Self {
            client,
            base_url,
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }

    /// Create from environment: `LLMRIG_OLLAMA_URL`, then `OLLAMA_BASE`,
    /// then the default endpoint.
    pub fn from_env() -> Self {
        let base_url = std::env::var("LLMRIG_OLLAMA_URL")
            .or_else(|_| std::env::var("OLLAMA_BASE"))
            .unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());
        Self::with_base_url(base_url)
    }

    /// Override the default request timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// List installed models via `/api/tags`, shaped as inventory
    /// descriptors for the pool normalizer.
    pub async fn list_installed(&self) -> Result<Vec<InstalledModelDescriptor>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Runtime(format!(
                "Ollama tags listing returned {}",
                status
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Error::Runtime(format!("Failed to parse tags response: {}", e)))?;

        let descriptors = tags
            .models
            .into_iter()
            .map(|model| {
                let details = model.details.unwrap_or_default();
                let params_b = details
                    .parameter_size
                    .as_deref()
                    .and_then(parse_params_b)
                    .or_else(|| parse_params_b(&model.name));
                InstalledModelDescriptor {
                    identifier: model.name,
                    params_b,
                    quant: details.quantization_level,
                    context_length: None,
                    size_gb: model.size.map(|bytes| bytes as f64 / 1e9),
                    tags: Vec::new(),
                    digest: model.digest,
                    license: None,
                }
            })
            .collect();

        Ok(descriptors)
    }
}

impl Default for OllamaRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuntimeExecutor for OllamaRuntime {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationRun> {
        let start = Instant::now();
        let timeout = options
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(self.timeout_secs));

        let request = GenerateRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateRequestOptions {
                num_predict: options.num_predict,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(timeout)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Runtime(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Runtime(format!("Failed to parse response: {}", e)))?;

        let latency_ms = start.elapsed().as_millis() as u64;
        if latency_ms > self.timeout_secs * 1000 {
            warn!(
                subsystem = "probe",
                component = "ollama",
                model,
                duration_ms = latency_ms,
                slow = true,
                "Slow generation operation"
            );
        }

        debug!(
            subsystem = "probe",
            component = "ollama",
            model,
            duration_ms = latency_ms,
            response_len = result.response.len(),
            "Generation complete"
        );

        Ok(GenerationRun {
            output: result.response,
            latency_ms,
            ttft_ms: result.prompt_eval_duration.map(ns_to_ms),
            eval_count: result.eval_count,
            eval_duration_ms: result.eval_duration.map(ns_to_ms),
        })
    }

    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Ollama
    }
}

fn ns_to_ms(ns: u64) -> u64 {
    ns / 1_000_000
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateRequestOptions,
}

#[derive(Serialize)]
struct GenerateRequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Response from the Ollama `/api/generate` endpoint. Durations are
/// nanoseconds.
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    eval_count: Option<u64>,
    eval_duration: Option<u64>,
    prompt_eval_duration: Option<u64>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagsModel>,
}

#[derive(Deserialize)]
struct TagsModel {
    name: String,
    size: Option<u64>,
    digest: Option<String>,
    details: Option<TagsModelDetails>,
}

#[derive(Deserialize, Default)]
struct TagsModelDetails {
    parameter_size: Option<String>,
    quantization_level: Option<String>,
}
