//! Identity collaborator: turns bearer tokens into requester ids and performs
//! privileged account operations.
//!
//! Two verifiers are available:
//! - [`JwtVerifier`]: checks HS256 session tokens locally with the project secret
//! - [`SupabaseAuthVerifier`]: asks Supabase Auth who the token belongs to
//!
//! Account deletion goes through [`SupabaseAdmin`], which needs the service
//! role key and is never used by the decomposition pipeline.

mod jwt;
mod supabase;

pub use jwt::JwtVerifier;
pub use supabase::{SupabaseAdmin, SupabaseAuthVerifier};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;

/// Opaque identifier of an authenticated caller. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequesterId(String);

impl RequesterId {
    /// Wrap an identifier; `None` if it is empty after trimming.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequesterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid or expired token: {0}")]
    InvalidToken(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Identity provider error: {0}")]
    Provider(String),
}

/// Resolves a bearer token to the caller's identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<RequesterId, IdentityError>;
}

/// Privileged account management.
#[async_trait]
pub trait AccountAdmin: Send + Sync {
    /// Irreversibly remove the user's identity record.
    async fn delete_user(&self, user: &RequesterId) -> Result<(), IdentityError>;
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Pick a verifier from configuration. Local JWT verification wins when a
/// secret is configured.
pub fn create_verifier(config: &Config) -> Option<Arc<dyn IdentityVerifier>> {
    let supabase = &config.supabase;
    if let Some(secret) = supabase.jwt_secret.as_deref() {
        return Some(Arc::new(JwtVerifier::new(secret)));
    }
    match (supabase.url.as_deref(), supabase.anon_key.as_deref()) {
        (Some(url), Some(anon_key)) => Some(Arc::new(SupabaseAuthVerifier::new(url, anon_key))),
        _ => None,
    }
}

/// Build the account admin if the service role key is available.
pub fn create_account_admin(config: &Config) -> Option<Arc<dyn AccountAdmin>> {
    match (
        config.supabase.url.as_deref(),
        config.supabase.service_role_key.as_deref(),
    ) {
        (Some(url), Some(key)) => Some(Arc::new(SupabaseAdmin::new(url, key))),
        _ => None,
    }
}
