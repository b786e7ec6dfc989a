//! Error types for the report pipeline, the source connectors and the notifier.
//!
//! [`ReportError`] is the taxonomy surfaced by the core (store, prompt registry,
//! summarization backend, generator and aggregator). Nothing in the core
//! retries or swallows these; callers decide whether to log-and-continue or
//! fail the request.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::ReportKind;

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("failed to write {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no prompt template available for report kind `{0}`")]
    PromptNotFound(ReportKind),

    #[error("prompt template {} could not be loaded: {reason}", path.display())]
    PromptLoad { path: PathBuf, reason: String },

    #[error("unsupported summarization backend `{0}` (expected `openai` or `ollama`)")]
    UnsupportedBackend(String),

    #[error("{provider} generation failed: {detail}")]
    Generation { provider: String, detail: String },

    #[error("no reports matching the unit pattern found in {}", .0.display())]
    NoReportsFound(PathBuf),

    #[error("report kind `{0}` cannot be built as a digest")]
    NotADigest(ReportKind),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ReportError {
    pub(crate) fn generation(provider: &str, detail: impl Into<String>) -> Self {
        ReportError::Generation {
            provider: provider.to_string(),
            detail: detail.into(),
        }
    }

    /// True when the failure means there was nothing to summarize, as opposed
    /// to a broken backend or configuration.
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            ReportError::DocumentNotFound(_) | ReportError::NoReportsFound(_)
        )
    }
}

/// Failures raised by the source connectors.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("http request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("api error code {code}: {message}")]
    Api { code: i64, message: String },

    #[error("unexpected response shape: {0}")]
    Parse(String),

    #[error("no items found for {0}")]
    Empty(String),

    #[error(transparent)]
    Store(#[from] ReportError),
}

impl ConnectorError {
    /// Network errors, rate limiting and server errors are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ConnectorError::Http { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            ConnectorError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn is_no_data(&self) -> bool {
        match self {
            ConnectorError::Empty(_) => true,
            ConnectorError::Store(e) => e.is_no_data(),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook delivery failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook answered with status {0}")]
    Status(u16),
}

/// A failure anywhere in fetch → summarize, as seen by jobs and the CLI.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

impl PipelineError {
    pub fn is_no_data(&self) -> bool {
        match self {
            PipelineError::Connector(e) => e.is_no_data(),
            PipelineError::Report(e) => e.is_no_data(),
        }
    }
}
