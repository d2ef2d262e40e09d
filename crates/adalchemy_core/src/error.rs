use thiserror::Error;

use crate::config::ConfigError;

/// A company document that cannot be turned into a queue message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Agent output that could not be coerced into structured data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} (excerpt: {excerpt:?})")]
pub struct ParseError {
    pub reason: String,
    pub excerpt: String,
}

const EXCERPT_CHARS: usize = 120;

impl ParseError {
    pub fn new(reason: impl Into<String>, content: &str) -> Self {
        Self {
            reason: reason.into(),
            excerpt: content.chars().take(EXCERPT_CHARS).collect(),
        }
    }
}

/// Failure of a single handler invocation.
///
/// Fatal variants are answered with a status response and never redelivered.
/// Everything else is surfaced as an invocation error so the queue or the
/// orchestrator decides on redelivery, backoff and dead-lettering.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("No companies found in collection {collection}")]
    EmptyCollection { collection: String },
    #[error("malformed queue message: {0}")]
    MalformedMessage(String),
    #[error("upstream call failed: {0}")]
    Upstream(String),
    #[error("failed to parse agent output: {0}")]
    Parse(#[from] ParseError),
    #[error("store operation failed: {0}")]
    Store(String),
    #[error("notification failed: {0}")]
    Notify(String),
}

impl PipelineError {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::BadRequest(_) | Self::EmptyCollection { .. }
        )
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Upstream(_) | Self::Notify(_) => 502,
            _ => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "misconfiguration",
            Self::BadRequest(_) => "validation_error",
            Self::EmptyCollection { .. } => "empty_collection",
            Self::MalformedMessage(_) => "malformed_message",
            Self::Upstream(_) => "upstream_error",
            Self::Parse(_) => "parse_error",
            Self::Store(_) => "store_error",
            Self::Notify(_) => "notify_error",
        }
    }
}
