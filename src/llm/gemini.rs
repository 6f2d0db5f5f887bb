//! Gemini `generateContent` client. One request per call, no retries.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::{classify_http_failure, ModelError, ModelErrorKind};
use super::{ModelClient, ModelInvocation, RawModelOutput};
use crate::config::ModelConfig;

/// Gemini API client.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiClient {
    /// Create a client against the public Gemini endpoint.
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            api_base: crate::config::DEFAULT_GEMINI_API_BASE.to_string(),
        }
    }

    /// Point the client at another base URL (relay, test server).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Build a client from configuration. Returns `None` when no API key is set.
    pub fn from_config(config: &ModelConfig) -> anyhow::Result<Option<Self>> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Some(Self {
            client: builder.build()?,
            api_key,
            model: config.model.clone(),
            api_base: config.api_base.clone(),
        }))
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    fn http_error(status: u16, body: String) -> ModelError {
        match classify_http_failure(status, &body) {
            ModelErrorKind::Gateway => ModelError::gateway(Some(status), body),
            _ => ModelError::upstream_http(status, body),
        }
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, invocation: &ModelInvocation) -> Result<RawModelOutput, ModelError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: invocation.prompt(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: invocation.response_mime_type(),
                temperature: invocation.temperature(),
                max_output_tokens: invocation.max_output_tokens(),
            },
        };

        tracing::debug!(
            model = %self.model,
            prompt_chars = invocation.prompt().chars().count(),
            "Sending generateContent request"
        );

        let response = match self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                if e.is_timeout() {
                    return Err(ModelError::transport(format!("Request timeout: {}", e)));
                } else if e.is_connect() {
                    return Err(ModelError::transport(format!("Connection failed: {}", e)));
                } else {
                    return Err(ModelError::transport(format!("Request failed: {}", e)));
                }
            }
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModelError::transport(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(Self::http_error(status.as_u16(), body));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            ModelError::gateway(
                Some(status.as_u16()),
                format!("Unrecognised response envelope: {}", e),
            )
        })?;

        if parsed.candidates.is_empty() {
            tracing::warn!(
                model = %self.model,
                prompt_feedback = ?parsed.prompt_feedback,
                "Model returned no candidates"
            );
        }

        Ok(RawModelOutput::new(parsed.into_first_text().unwrap_or_default()))
    }
}

/// generateContent request body.
#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

/// generateContent response body. Only the fields we read.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// First candidate's first part text.
    fn into_first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}
