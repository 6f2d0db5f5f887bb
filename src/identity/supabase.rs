//! Supabase Auth clients: session lookup and admin user deletion.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{AccountAdmin, IdentityError, IdentityVerifier, RequesterId};

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

/// Verifies tokens by calling `GET /auth/v1/user` with the caller's token.
pub struct SupabaseAuthVerifier {
    client: Client,
    url: String,
    anon_key: String,
}

impl SupabaseAuthVerifier {
    pub fn new(url: &str, anon_key: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }
}

#[async_trait]
impl IdentityVerifier for SupabaseAuthVerifier {
    async fn verify(&self, token: &str) -> Result<RequesterId, IdentityError> {
        let resp = self
            .client
            .get(format!("{}/auth/v1/user", self.url))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| IdentityError::Provider(format!("Failed to reach auth service: {}", e)))?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        match status {
            s if s.is_success() => {
                let user: AuthUser = serde_json::from_str(&text)
                    .map_err(|e| IdentityError::Provider(format!("Unexpected user payload: {}", e)))?;
                RequesterId::new(user.id)
                    .ok_or_else(|| IdentityError::InvalidToken("user has no id".to_string()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                Err(IdentityError::InvalidToken(text))
            }
            _ => Err(IdentityError::Provider(format!("{} - {}", status, text))),
        }
    }
}

/// Deletes users through `DELETE /auth/v1/admin/users/{id}` with the service role key.
pub struct SupabaseAdmin {
    client: Client,
    url: String,
    service_role_key: String,
}

impl SupabaseAdmin {
    pub fn new(url: &str, service_role_key: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            service_role_key: service_role_key.to_string(),
        }
    }
}

#[async_trait]
impl AccountAdmin for SupabaseAdmin {
    async fn delete_user(&self, user: &RequesterId) -> Result<(), IdentityError> {
        let resp = self
            .client
            .delete(format!(
                "{}/auth/v1/admin/users/{}",
                self.url,
                urlencoding::encode(user.as_str())
            ))
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
            .send()
            .await
            .map_err(|e| IdentityError::Provider(format!("Failed to reach auth service: {}", e)))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::NOT_FOUND {
            return Err(IdentityError::UserNotFound);
        }
        let text = resp.text().await.unwrap_or_default();
        Err(IdentityError::Provider(format!("{} - {}", status, text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn verifier_resolves_user_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("apikey", "anon"))
            .and(header("Authorization", "Bearer session-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "5f0c", "email": "a@example.com" })),
            )
            .mount(&server)
            .await;

        let verifier = SupabaseAuthVerifier::new(&server.uri(), "anon");
        let id = verifier.verify("session-token").await.expect("verify");
        assert_eq!(id.as_str(), "5f0c");
    }

    #[tokio::test]
    async fn verifier_maps_401_to_invalid_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid JWT"))
            .mount(&server)
            .await;

        let verifier = SupabaseAuthVerifier::new(&server.uri(), "anon");
        assert!(matches!(
            verifier.verify("stale").await,
            Err(IdentityError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn admin_delete_is_clean_on_second_call() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/auth/v1/admin/users/5f0c"))
            .and(header("Authorization", "Bearer service"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/auth/v1/admin/users/5f0c"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "msg": "User not found" })))
            .mount(&server)
            .await;

        let admin = SupabaseAdmin::new(&server.uri(), "service");
        let user = RequesterId::new("5f0c").expect("id");
        admin.delete_user(&user).await.expect("first delete");
        assert!(matches!(
            admin.delete_user(&user).await,
            Err(IdentityError::UserNotFound)
        ));
    }
}
