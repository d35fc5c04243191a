//! User authentication is an external collaborator (§1): this crate only
//! depends on a `token -> user identity` verifier, never on how tokens are
//! issued or stored.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AuthedIdentity {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("authenticator unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthedIdentity, AuthError>;
}

/// Stand-in authenticator: accepts any non-empty token, deriving a stable
/// identity from it. Production deployments supply their own
/// [`Authenticator`] backed by the real auth backend (out of scope, §1).
pub struct OpaqueTokenAuthenticator;

#[async_trait]
impl Authenticator for OpaqueTokenAuthenticator {
    async fn verify(&self, token: &str) -> Result<AuthedIdentity, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }
        Ok(AuthedIdentity {
            user_id: token.to_string(),
            email: format!("{token}@example.invalid"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_empty_token() {
        let err = OpaqueTokenAuthenticator.verify("").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn accepts_nonempty_token() {
        let identity = OpaqueTokenAuthenticator.verify("abc123").await.unwrap();
        assert_eq!(identity.user_id, "abc123");
    }
}
