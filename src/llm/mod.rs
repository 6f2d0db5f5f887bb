//! Model client module for the decomposition pipeline.
//!
//! This module provides a trait-based abstraction over the text generation
//! endpoint, with Gemini (`generateContent`) as the implementation.

mod error;
mod gemini;

pub use error::{classify_http_failure, ModelError, ModelErrorKind};
pub use gemini::GeminiClient;

use async_trait::async_trait;

/// Fixed sampling temperature for decomposition calls.
pub const DECOMPOSE_TEMPERATURE: f64 = 0.2;
/// Fixed output token bound for decomposition calls.
pub const DECOMPOSE_MAX_OUTPUT_TOKENS: u32 = 800;
/// Response MIME type that puts the model in JSON-only mode.
pub const JSON_RESPONSE_MIME_TYPE: &str = "application/json";

/// A single, immutable model call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInvocation {
    prompt: String,
    temperature: f64,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

impl ModelInvocation {
    /// Build a JSON-constrained invocation for the given prompt.
    pub fn json(prompt: String) -> Self {
        Self {
            prompt,
            temperature: DECOMPOSE_TEMPERATURE,
            max_output_tokens: DECOMPOSE_MAX_OUTPUT_TOKENS,
            response_mime_type: JSON_RESPONSE_MIME_TYPE,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }

    pub fn response_mime_type(&self) -> &'static str {
        self.response_mime_type
    }
}

/// The model's literal reply, not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModelOutput {
    pub text: String,
}

impl RawModelOutput {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Trait for model clients.
///
/// Implementations make exactly one upstream call per `generate` and never
/// cache results.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, invocation: &ModelInvocation) -> Result<RawModelOutput, ModelError>;
}
