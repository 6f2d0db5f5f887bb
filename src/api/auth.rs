//! Bearer token authentication for protected routes.
//!
//! - Clients send `Authorization: Bearer <session token>`
//! - The configured [`IdentityVerifier`](crate::identity::IdentityVerifier)
//!   resolves the token to a requester id
//! - Handlers read the caller from `Extension<AuthUser>`
//!
//! A request without a bearer token is rejected with 401 first. With a token
//! but no configured verifier, protected routes fail closed with 500.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::routes::AppState;
use super::types::ErrorBody;
use crate::identity::{bearer_token, IdentityError, RequesterId};

/// The authenticated caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: RequesterId,
}

fn reject(status: StatusCode, kind: &str, message: &str) -> Response {
    (status, Json(ErrorBody::new(kind, message))).into_response()
}

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string);

    let Some(token) = token else {
        return reject(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "Missing Authorization header",
        );
    };

    let verifier = match state.verifier.as_ref() {
        Some(v) => Arc::clone(v),
        None => {
            return reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_missing",
                "Token verification not configured",
            );
        }
    };

    match verifier.verify(&token).await {
        Ok(id) => {
            tracing::debug!(requester = %id, "Authenticated request");
            req.extensions_mut().insert(AuthUser { id });
            next.run(req).await
        }
        Err(IdentityError::InvalidToken(_)) | Err(IdentityError::UserNotFound) => reject(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "Invalid or expired token",
        ),
        Err(IdentityError::Provider(e)) => {
            tracing::warn!("Token verification failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody::new("identity_provider", "Token verification failed").with_details(e)),
            )
                .into_response()
        }
    }
}
