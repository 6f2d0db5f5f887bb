//! Model call error types.
//!
//! Every failed model call falls into exactly one of three domains, each of
//! which points at a different operator action: fix the network/config,
//! investigate the relay in front of the model, or look at the model provider.

/// Error from a model API call.
#[derive(Debug, Clone)]
pub struct ModelError {
    /// The kind of error
    pub kind: ModelErrorKind,
    /// HTTP status code, if a response was received
    pub status_code: Option<u16>,
    /// Error message (response body for HTTP failures)
    pub message: String,
}

impl ModelError {
    /// The request never produced a response.
    pub fn transport(message: String) -> Self {
        Self {
            kind: ModelErrorKind::Transport,
            status_code: None,
            message,
        }
    }

    /// A relay between us and the model rejected or mangled the call.
    pub fn gateway(status_code: Option<u16>, message: String) -> Self {
        Self {
            kind: ModelErrorKind::Gateway,
            status_code,
            message,
        }
    }

    /// The model endpoint answered with a non-success status.
    pub fn upstream_http(status_code: u16, body: String) -> Self {
        Self {
            kind: ModelErrorKind::UpstreamHttp,
            status_code: Some(status_code),
            message: body,
        }
    }
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for ModelError {}

/// Classification of model call failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelErrorKind {
    /// Connection, DNS, TLS or timeout failure before any response
    Transport,
    /// Intermediary (proxy, load balancer, relay) failure
    Gateway,
    /// Non-success status from the model API itself
    UpstreamHttp,
}

impl std::fmt::Display for ModelErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelErrorKind::Transport => write!(f, "Transport failure"),
            ModelErrorKind::Gateway => write!(f, "Gateway failure"),
            ModelErrorKind::UpstreamHttp => write!(f, "Upstream HTTP failure"),
        }
    }
}

/// Classify a non-success HTTP response.
///
/// The model API always answers errors with a JSON envelope
/// (`{"error": {...}}`). A 502/503/504 without one was produced by something
/// in between.
pub fn classify_http_failure(status: u16, body: &str) -> ModelErrorKind {
    let gateway_status = matches!(status, 502 | 503 | 504);
    if gateway_status && !is_api_error_envelope(body) {
        ModelErrorKind::Gateway
    } else {
        ModelErrorKind::UpstreamHttp
    }
}

fn is_api_error_envelope(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body)
        .map(|v| v.get("error").is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_failure_classification() {
        assert_eq!(
            classify_http_failure(500, r#"{"error":{"code":500}}"#),
            ModelErrorKind::UpstreamHttp
        );
        assert_eq!(classify_http_failure(500, "oops"), ModelErrorKind::UpstreamHttp);
        assert_eq!(classify_http_failure(400, ""), ModelErrorKind::UpstreamHttp);
        assert_eq!(
            classify_http_failure(503, r#"{"error":{"status":"UNAVAILABLE"}}"#),
            ModelErrorKind::UpstreamHttp
        );
        assert_eq!(
            classify_http_failure(502, "<html>Bad Gateway</html>"),
            ModelErrorKind::Gateway
        );
        assert_eq!(classify_http_failure(504, ""), ModelErrorKind::Gateway);
    }

    #[test]
    fn test_display_includes_status() {
        let err = ModelError::upstream_http(500, "boom".to_string());
        assert_eq!(err.to_string(), "Upstream HTTP failure (HTTP 500): boom");

        let err = ModelError::transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Transport failure: connection refused");
    }
}
