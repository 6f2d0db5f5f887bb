//! Owner-scoped task record management.
//!
//! - `GET /api/todos` - List the caller's records, newest first
//! - `POST /api/todos` - Create one record
//! - `PATCH /api/todos/:id` - Set the completion flag
//! - `DELETE /api/todos/:id` - Delete a record
//!
//! A record owned by someone else is reported as not found.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};

use super::auth::AuthUser;
use super::routes::AppState;
use super::types::{CreateTodoRequest, ErrorBody, UpdateTodoRequest};
use crate::decompose::clamp_title;
use crate::store::{NewTaskRecord, TaskId, TaskRecord};

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_todos).post(create_todo))
        .route("/:id", patch(update_todo).delete(delete_todo))
}

fn store_error(e: String) -> ApiError {
    tracing::error!("Task store error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new("persistence_failure", "Task store error").with_details(e)),
    )
}

fn not_found(id: TaskId) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new("not_found", format!("Task {} not found", id))),
    )
}

async fn list_todos(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<TaskRecord>>, ApiError> {
    let records = state
        .store
        .list_for_owner(user.id.as_str())
        .await
        .map_err(store_error)?;
    Ok(Json(records))
}

async fn create_todo(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TaskRecord>), ApiError> {
    let title = clamp_title(&req.title, state.config.limits.max_title_chars).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("empty_input", "Empty title")),
        )
    })?;

    let mut created = state
        .store
        .insert_batch(&[NewTaskRecord {
            title,
            is_done: false,
            owner_id: user.id.as_str().to_string(),
        }])
        .await
        .map_err(store_error)?;

    let record = created
        .pop()
        .ok_or_else(|| store_error("insert returned no record".to_string()))?;
    tracing::debug!(requester = %user.id, id = record.id, "Created task");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_todo(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TaskId>,
    Json(req): Json<UpdateTodoRequest>,
) -> Result<Json<TaskRecord>, ApiError> {
    state
        .store
        .set_done(user.id.as_str(), id, req.is_done)
        .await
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

async fn delete_todo(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TaskId>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .store
        .delete(user.id.as_str(), id)
        .await
        .map_err(store_error)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}
