//! Error types for llmrig.
//!
//! Only conditions that are fatal to an invocation surface as `Error`
//! values. Per-candidate and per-model conditions that the pipeline can
//! recover from are modeled as `Option` returns or tagged statuses on the
//! affected record, never as errors.

use thiserror::Error;

/// Result type alias using llmrig's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for llmrig operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid caller input (bad category, conflicting flags, bad profile)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Malformed prompt suite line (1-based line number)
    #[error("Prompt suite parse error at line {line}: {message}")]
    Suite { line: usize, message: String },

    /// Unknown calibration execution mode
    #[error("Invalid execution mode: {0}")]
    InvalidMode(String),

    /// Runtime not supported for the requested operation. The message is
    /// pre-formatted at the construction site and stable across releases.
    #[error("{0}")]
    UnsupportedRuntime(String),

    /// Inference runtime returned a non-OK or unparseable response
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Request to the inference daemon timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Artifact path unreadable or unwritable
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// YAML artifact error
    #[error("YAML error: {0}")]
    Yaml(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Yaml(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Request(e.to_string())
        }
    }
}

impl Error {
    /// Short machine-readable code attached to failed calibration records.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Timeout(_) => "ETIMEDOUT",
            Error::Request(_) => "EREQUEST",
            Error::Runtime(_) => "ERUNTIME",
            Error::Serialization(_) => "EPARSE",
            Error::Io(_) => "EIO",
            _ => "EINVAL",
        }
    }
}
