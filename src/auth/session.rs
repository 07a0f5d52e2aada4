use crate::error::{AppError, Result};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// An authenticated caller as known to the identity service.
///
/// This is the raw authentication identity, not the platform Profile; the
/// two are linked by [`Identity::id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Opaque identifier assigned by the identity service.
    pub id: String,
    pub email: String,
}

/// Trait for resolving a session token to the calling identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a session token and return the identity it belongs to.
    async fn verify_session(&self, token: &str) -> Result<Identity>;
}

/// Session token claims issued by the identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    email: String,
    exp: u64,
}

/// Identity provider that verifies HS256 session tokens.
///
/// The hosted identity service signs session JWTs with a shared secret; we
/// verify locally rather than calling back to the service on every request.
pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(secret: &SecretString) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify_session(&self, token: &str) -> Result<Identity> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::unauthorized(format!("Invalid session token: {}", e)))?;

        Ok(Identity {
            id: data.claims.sub,
            email: data.claims.email,
        })
    }
}

/// Identity provider backed by a static token map.
///
/// Used in tests and local development where no identity service is running.
#[derive(Default)]
pub struct StaticTokenProvider {
    tokens: RwLock<HashMap<String, Identity>>,
}

impl StaticTokenProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for an identity.
    pub fn insert(&self, token: impl Into<String>, identity: Identity) {
        self.tokens.write().unwrap().insert(token.into(), identity);
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn verify_session(&self, token: &str) -> Result<Identity> {
        self.tokens
            .read()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Unknown session token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn issue_token(secret: &str, sub: &str, email: &str, exp: u64) -> String {
        let claims = SessionClaims {
            sub: sub.to_string(),
            email: email.to_string(),
            exp,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn future_exp() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 3600
    }

    #[tokio::test]
    async fn verifies_valid_session_token() {
        let secret = SecretString::new("session-signing-secret".to_string());
        let provider = JwtIdentityProvider::new(&secret);

        let token = issue_token("session-signing-secret", "auth_1", "reader@example.com", future_exp());
        let identity = provider.verify_session(&token).await.unwrap();

        assert_eq!(identity.id, "auth_1");
        assert_eq!(identity.email, "reader@example.com");
    }

    #[tokio::test]
    async fn rejects_token_signed_with_wrong_secret() {
        let provider = JwtIdentityProvider::new(&SecretString::new("right-secret".to_string()));
        let token = issue_token("wrong-secret", "auth_1", "reader@example.com", future_exp());

        let result = provider.verify_session(&token).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let provider = JwtIdentityProvider::new(&SecretString::new("secret".to_string()));
        let token = issue_token("secret", "auth_1", "reader@example.com", 1_000_000);

        let result = provider.verify_session(&token).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn rejects_garbage_token() {
        let provider = JwtIdentityProvider::new(&SecretString::new("secret".to_string()));
        let result = provider.verify_session("not-a-jwt").await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn static_provider_resolves_registered_tokens() {
        let provider = StaticTokenProvider::new();
        provider.insert(
            "tok_abc",
            Identity {
                id: "auth_9".to_string(),
                email: "author@example.com".to_string(),
            },
        );

        let identity = provider.verify_session("tok_abc").await.unwrap();
        assert_eq!(identity.id, "auth_9");

        let result = provider.verify_session("tok_other").await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
