//! Local verification of Supabase session JWTs (HS256, project secret).

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use super::{IdentityError, IdentityVerifier, RequesterId};

const SESSION_AUDIENCE: &str = "authenticated";

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    /// User id
    sub: String,
    /// Expiration unix seconds
    exp: i64,
    /// Audience ("authenticated" for signed-in users)
    aud: String,
}

pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[SESSION_AUDIENCE]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<RequesterId, IdentityError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))?;
        RequesterId::new(data.claims.sub)
            .ok_or_else(|| IdentityError::InvalidToken("token has no subject".to_string()))
    }
}
