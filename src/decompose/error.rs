//! Decomposition pipeline errors.

use thiserror::Error;

use crate::llm::{ModelError, ModelErrorKind};

/// Every way a decomposition request can fail. The kinds are mutually
/// exclusive; callers match on them exhaustively.
#[derive(Debug, Error)]
pub enum DecomposeError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Empty text")]
    EmptyInput,

    #[error("Text too long (max {max_chars} chars, got {actual_chars})")]
    InputTooLong {
        max_chars: usize,
        actual_chars: usize,
    },

    #[error("{0} is not set")]
    ConfigurationMissing(String),

    #[error("Model endpoint unreachable: {message}")]
    TransportFailure { message: String },

    #[error("Gateway failure: {message}")]
    GatewayFailure {
        status: Option<u16>,
        message: String,
    },

    #[error("Model endpoint returned HTTP {status}")]
    UpstreamHttpFailure { status: u16, details: String },

    #[error("Model did not return JSON array")]
    MalformedModelOutput { raw: String },

    #[error("Failed to persist tasks: {detail}")]
    PersistenceFailure { detail: String },
}

impl DecomposeError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DecomposeError::Unauthenticated(_) => "unauthenticated",
            DecomposeError::EmptyInput => "empty_input",
            DecomposeError::InputTooLong { .. } => "input_too_long",
            DecomposeError::ConfigurationMissing(_) => "configuration_missing",
            DecomposeError::TransportFailure { .. } => "transport_failure",
            DecomposeError::GatewayFailure { .. } => "gateway_failure",
            DecomposeError::UpstreamHttpFailure { .. } => "upstream_http_failure",
            DecomposeError::MalformedModelOutput { .. } => "malformed_model_output",
            DecomposeError::PersistenceFailure { .. } => "persistence_failure",
        }
    }

    /// HTTP status this failure is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            DecomposeError::Unauthenticated(_) => 401,
            DecomposeError::EmptyInput => 400,
            DecomposeError::InputTooLong { .. } => 413,
            DecomposeError::ConfigurationMissing(_) => 500,
            DecomposeError::TransportFailure { .. } => 503,
            DecomposeError::GatewayFailure { .. } => 502,
            DecomposeError::UpstreamHttpFailure { .. } => 502,
            DecomposeError::MalformedModelOutput { .. } => 422,
            DecomposeError::PersistenceFailure { .. } => 500,
        }
    }

    /// Raw model text attached to the failure, if any.
    pub fn raw_model_output(&self) -> Option<&str> {
        match self {
            DecomposeError::MalformedModelOutput { raw } => Some(raw),
            _ => None,
        }
    }
}

impl From<ModelError> for DecomposeError {
    fn from(err: ModelError) -> Self {
        match err.kind {
            ModelErrorKind::Transport => DecomposeError::TransportFailure {
                message: err.message,
            },
            ModelErrorKind::Gateway => DecomposeError::GatewayFailure {
                status: err.status_code,
                message: err.message,
            },
            ModelErrorKind::UpstreamHttp => DecomposeError::UpstreamHttpFailure {
                // upstream_http always carries a status
                status: err.status_code.unwrap_or(0),
                details: err.message,
            },
        }
    }
}
