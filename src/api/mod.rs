//! HTTP API for the task service.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check (public)
//! - `POST /api/ai-todos` - Decompose free text into stored tasks
//! - `GET /api/todos` - List the caller's tasks
//! - `POST /api/todos` - Create a task
//! - `PATCH /api/todos/{id}` - Set a task's completion flag
//! - `DELETE /api/todos/{id}` - Delete a task
//! - `POST /api/account/delete` - Delete the caller's account
//!
//! Everything except health requires `Authorization: Bearer <token>`.

mod account;
mod auth;
mod decompose;
mod routes;
mod todos;
pub mod types;

pub use auth::AuthUser;
pub use routes::{app, serve, AppState};
pub use types::*;
