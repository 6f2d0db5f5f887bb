//! `POST /api/account/delete`: remove the caller's identity record.

use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};

use super::auth::AuthUser;
use super::routes::AppState;
use super::types::{DeleteAccountResponse, ErrorBody};
use crate::identity::IdentityError;

pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DeleteAccountResponse>, (StatusCode, Json<ErrorBody>)> {
    let admin = state.admin.as_ref().ok_or_else(|| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(
                ErrorBody::new("configuration_missing", "Server misconfigured")
                    .with_details("SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY are required"),
            ),
        )
    })?;

    match admin.delete_user(&user.id).await {
        Ok(()) => {
            tracing::info!(requester = %user.id, "Deleted account");
            Ok(Json(DeleteAccountResponse {
                ok: true,
                deleted_user_id: user.id.to_string(),
            }))
        }
        Err(IdentityError::UserNotFound) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new("not_found", "User not found")),
        )),
        Err(e) => {
            tracing::error!(requester = %user.id, "Failed to delete account: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("account_deletion_failed", "Failed to delete user")
                    .with_details(e.to_string())),
            ))
        }
    }
}
