// security/src/lib.rs

//! Session tokens shared with the external auth provider, and the role
//! permission table.

pub mod roles;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use models::{EntityId, UserRole};

pub use roles::{RoleConfig, RolesConfig};

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub role: UserRole,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<EntityId, AuthError> {
        EntityId::new(self.sub.clone())
            .map_err(|e| AuthError::InvalidToken(format!("bad subject: {}", e)))
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingToken,
    #[error("Invalid session token: {0}")]
    InvalidToken(String),
    #[error("Failed to sign session token: {0}")]
    Signing(String),
}

/// HS256 keys derived from the shared session secret.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    pub fn from_secret(secret: &str) -> Self {
        SessionKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue_token(
        &self,
        user_id: &EntityId,
        role: UserRole,
        email: Option<String>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            email,
            exp: (issued_at + ttl).timestamp(),
            iat: issued_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Checks signature and expiry.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKeys(<redacted>)")
    }
}

/// Picks the session token from an `Authorization: Bearer` header, falling
/// back to the named cookie in a `Cookie` header.
pub fn extract_token(
    authorization: Option<&str>,
    cookie_header: Option<&str>,
    cookie_name: &str,
) -> Option<String> {
    if let Some(token) = authorization
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }
    cookie_header?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> SessionKeys {
        SessionKeys::from_secret("test-session-secret")
    }

    fn user() -> EntityId {
        EntityId::new("cuser123".to_string()).unwrap()
    }

    #[test]
    fn issued_token_validates() {
        let token = keys()
            .issue_token(&user(), UserRole::Doctor, Some("dr@precta.test".to_string()), Utc::now(), Duration::hours(1))
            .unwrap();
        let claims = keys().validate_token(&token).unwrap();
        assert_eq!(claims.role, UserRole::Doctor);
        assert_eq!(claims.user_id().unwrap(), user());
        assert_eq!(claims.email.as_deref(), Some("dr@precta.test"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = keys()
            .issue_token(&user(), UserRole::Patient, None, Utc::now() - Duration::days(2), Duration::hours(1))
            .unwrap();
        assert!(matches!(keys().validate_token(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn wrong_secret_and_garbage_are_rejected() {
        let token = SessionKeys::from_secret("other-secret")
            .issue_token(&user(), UserRole::Admin, None, Utc::now(), Duration::hours(1))
            .unwrap();
        assert!(matches!(keys().validate_token(&token), Err(AuthError::InvalidToken(_))));
        assert!(matches!(keys().validate_token("not.a.token"), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn token_comes_from_bearer_or_cookie() {
        assert_eq!(extract_token(Some("Bearer abc"), None, "precta_session").as_deref(), Some("abc"));
        assert_eq!(
            extract_token(None, Some("theme=dark; precta_session=xyz; other=1"), "precta_session").as_deref(),
            Some("xyz")
        );
        assert_eq!(
            extract_token(Some("Bearer abc"), Some("precta_session=xyz"), "precta_session").as_deref(),
            Some("abc")
        );
        assert_eq!(extract_token(Some("Basic Zm9v"), Some("theme=dark"), "precta_session"), None);
    }
}
