//! `POST /api/ai-todos`: turn free text into stored tasks.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use super::auth::AuthUser;
use super::routes::AppState;
use super::types::{DecomposeRequestBody, DecomposeResponse};
use crate::decompose::DecomposeError;

impl IntoResponse for DecomposeError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut body = json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });

        let extra = match &self {
            DecomposeError::Unauthenticated(_)
            | DecomposeError::EmptyInput
            | DecomposeError::ConfigurationMissing(_) => None,
            DecomposeError::InputTooLong {
                max_chars,
                actual_chars,
            } => Some(json!({ "max_chars": max_chars, "actual_chars": actual_chars })),
            DecomposeError::TransportFailure { message } => Some(json!({ "details": message })),
            DecomposeError::GatewayFailure { status, message } => {
                Some(json!({ "status": status, "details": message }))
            }
            DecomposeError::UpstreamHttpFailure { status, details } => {
                Some(json!({ "status": status, "details": details }))
            }
            DecomposeError::MalformedModelOutput { raw } => Some(json!({ "raw_json": raw })),
            DecomposeError::PersistenceFailure { detail } => Some(json!({ "details": detail })),
        };

        if let (Some(Value::Object(extra)), Some(map)) = (extra, body.as_object_mut()) {
            map.extend(extra);
        }

        (status, Json(body)).into_response()
    }
}

/// The body is read as raw bytes so that a missing or broken body reaches the
/// pipeline as empty text.
pub async fn decompose(
    State(state): State<Arc<AppState>>,
    user: Option<Extension<AuthUser>>,
    body: Bytes,
) -> Result<Json<DecomposeResponse>, DecomposeError> {
    let text = DecomposeRequestBody::from_bytes(&body).text();
    let requester = user.map(|Extension(u)| u.id);

    let outcome = state.decomposer.run(requester, &text).await?;
    Ok(Json(DecomposeResponse {
        tasks: outcome.tasks,
        raw_json: outcome.raw_json,
    }))
}
