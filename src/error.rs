//! Error types for the aggregator
//!
//! `SourceError` is raised inside adapters. `FetchFailure` is the single shape
//! that leaves the orchestrator; its `Display` is the message callers see.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Request failed with status code {status} ({url})")]
    UpstreamStatus {
        status: u16,
        url: String,
    },

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid selector `{0}`")]
    SelectorError(String),

    #[error("{source_id}: missing `{field}` in upstream payload")]
    MissingField {
        source_id: String,
        field: &'static str,
    },

    #[error("{source_id}: pattern {pattern} did not match {input:?}")]
    PatternMismatch {
        source_id: String,
        pattern: String,
        input: String,
    },

    #[error("Invalid item: {0}")]
    ValidationError(String),

    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },

    #[error("Connection lost: {0}")]
    ConnectionLost(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// Outcome of a failed request, as reported to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("support targets: {}", .supported.join(", "))]
    MissingSource { supported: Vec<String> },

    #[error("target {name} is not supported")]
    UnsupportedSource {
        name: String,
        supported: Vec<String>,
    },

    #[error("{message}")]
    AdapterError { source_id: String, message: String },

    #[error("{0}")]
    Unexpected(String),
}

impl FetchFailure {
    /// Label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            FetchFailure::MissingSource { .. } => "missing_source",
            FetchFailure::UnsupportedSource { .. } => "unsupported_source",
            FetchFailure::AdapterError { .. } => "adapter_error",
            FetchFailure::Unexpected(_) => "unexpected",
        }
    }

    /// Caller errors are reported but not treated as faults
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            FetchFailure::MissingSource { .. } | FetchFailure::UnsupportedSource { .. }
        )
    }
}
