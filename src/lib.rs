//! # ai-todos
//!
//! Turns free-form text into a short list of stored TODO tasks with a language
//! model, and manages those tasks per user.
//!
//! ## Pipeline
//!
//! ```text
//!   text ──▶ validate ──▶ prompt ──▶ model ──▶ parse/normalize ──▶ materialize
//!              │            │         │              │                  │
//!          400/413     versioned   Gemini       422 on non-array    one batch,
//!                       template  generateContent                  owner-scoped
//! ```
//!
//! Each stage short-circuits with a classified [`decompose::DecomposeError`].
//! Nothing is stored unless every earlier stage succeeded.
//!
//! ## Modules
//! - `decompose`: the pipeline and its stages
//! - `llm`: model client trait and the Gemini implementation
//! - `store`: task records (memory, SQLite, Supabase)
//! - `identity`: bearer token verification and account administration
//! - `api`: axum routes
//! - `config`: environment configuration

pub mod api;
pub mod config;
pub mod decompose;
pub mod identity;
pub mod llm;
pub mod store;

pub use config::Config;
pub use decompose::{DecomposeError, Decomposer};
