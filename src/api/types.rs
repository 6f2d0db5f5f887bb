//! API request and response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decompose::CandidateTask;

/// Decomposition request body. Every field is optional so a malformed body
/// degrades to empty text instead of a framework rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecomposeRequestBody {
    #[serde(default)]
    pub text: Option<Value>,
}

impl DecomposeRequestBody {
    /// Parse a raw body. Anything unparseable reads as empty text.
    pub fn from_bytes(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// The text to decompose. Non-string scalars are read as their JSON text.
    pub fn text(&self) -> String {
        match &self.text {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Successful decomposition response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposeResponse {
    pub tasks: Vec<CandidateTask>,
    pub raw_json: String,
}

/// Request to create one task record by hand.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
}

/// Request to set a record's completion flag.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTodoRequest {
    pub is_done: bool,
}

/// Account deletion response. Field names follow the existing browser client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAccountResponse {
    pub ok: bool,
    #[serde(rename = "deletedUserId")]
    pub deleted_user_id: String,
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(kind: &str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: kind.to_string(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Configured task store backend
    pub task_store: String,

    /// Whether the task store survives restarts
    pub store_persistent: bool,

    /// Whether a model API key is configured
    pub model_configured: bool,

    /// Whether bearer tokens can be verified
    pub auth_configured: bool,

    /// Whether account deletion is available
    pub account_admin_configured: bool,
}
