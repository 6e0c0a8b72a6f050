//! Scripted mock runtime for deterministic testing.
//!
//! Latencies are data, not sleeps, so tests stay instant and reproducible.
//! Runs are consumed in FIFO order; an exhausted script produces failures
//! so accidental extra calls surface in assertions.

use async_trait::async_trait;
use llmrig_core::{
    Error, GenerationOptions, GenerationRun, Result, RuntimeExecutor, RuntimeKind,
};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum ScriptedRun {
    Ok {
        output: String,
        latency_ms: u64,
        ttft_ms: Option<u64>,
        eval_count: Option<u64>,
        eval_duration_ms: Option<u64>,
    },
    Failure(String),
    Timeout(String),
}

/// Deterministic scripted runtime.
pub struct MockRuntime {
    script: Mutex<VecDeque<ScriptedRun>>,
    call_log: Mutex<Vec<String>>,
    kind: RuntimeKind,
}

impl MockRuntime {
    /// New mock with an empty script. Calls against an empty script fail.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            call_log: Mutex::new(Vec::new()),
            kind: RuntimeKind::Ollama,
        }
    }

    /// Report as a different runtime kind.
    pub fn with_kind(mut self, kind: RuntimeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Queue a successful run.
    pub fn with_run(self, output: &str, latency_ms: u64, ttft_ms: Option<u64>) -> Self {
        self.script.lock().unwrap().push_back(ScriptedRun::Ok {
            output: output.to_string(),
            latency_ms,
            ttft_ms,
            eval_count: None,
            eval_duration_ms: None,
        });
        self
    }

    /// Queue a successful run that reports true token counts.
    pub fn with_counted_run(
        self,
        output: &str,
        latency_ms: u64,
        eval_count: u64,
        eval_duration_ms: u64,
    ) -> Self {
        self.script.lock().unwrap().push_back(ScriptedRun::Ok {
            output: output.to_string(),
            latency_ms,
            ttft_ms: None,
            eval_count: Some(eval_count),
            eval_duration_ms: Some(eval_duration_ms),
        });
        self
    }

    /// Queue a runtime failure.
    pub fn with_failure(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedRun::Failure(message.to_string()));
        self
    }

    /// Queue a timeout.
    pub fn with_timeout(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedRun::Timeout(message.to_string()));
        self
    }

    /// Number of generate calls issued.
    pub fn calls(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    /// Models generate was called with, in order.
    pub fn call_log(&self) -> Vec<String> {
        self.call_log.lock().unwrap().clone()
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuntimeExecutor for MockRuntime {
    async fn generate(
        &self,
        model: &str,
        _prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<GenerationRun> {
        self.call_log.lock().unwrap().push(model.to_string());

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(ScriptedRun::Ok {
                output,
                latency_ms,
                ttft_ms,
                eval_count,
                eval_duration_ms,
            }) => Ok(GenerationRun {
                output,
                latency_ms,
                ttft_ms,
                eval_count,
                eval_duration_ms,
            }),
            Some(ScriptedRun::Failure(message)) => Err(Error::Runtime(message)),
            Some(ScriptedRun::Timeout(message)) => Err(Error::Timeout(message)),
            None => Err(Error::Runtime(format!(
                "mock script exhausted for model {}",
                model
            ))),
        }
    }

    fn kind(&self) -> RuntimeKind {
        self.kind
    }
}
