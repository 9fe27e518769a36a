//! JWT access tokens
//!
//! HS256 tokens carrying the user id, role, email and display name. There are
//! no refresh tokens or server-side sessions; a token is valid until `exp`.

use chrono::Utc;
use database_layer::{User, UserRole};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT secret must not be empty")]
    EmptySecret,

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Failed to encode token: {0}")]
    Encoding(String),
}

/// JWT token claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub role: UserRole,
    pub email: String,
    pub name: String,
    /// Issued at timestamp (seconds since epoch)
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch)
    pub exp: i64,
    pub iss: String,
}

impl TokenClaims {
    pub fn for_user(user: &User, issuer: &str, ttl_seconds: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user.id,
            role: user.role,
            email: user.email.clone(),
            name: user.name.clone(),
            iat: now,
            exp: now + ttl_seconds,
            iss: issuer.to_string(),
        }
    }
}

/// Issues and validates HS256 access tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl_seconds: i64,
}

impl TokenService {
    pub fn new(secret: SecretString, issuer: &str, ttl_seconds: i64) -> Result<Self, TokenError> {
        let bytes = secret.expose_secret().as_bytes();
        if bytes.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
            issuer: issuer.to_string(),
            ttl_seconds,
        })
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Generate a new access token for `user`.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let claims = TokenClaims::for_user(user, &self.issuer, self.ttl_seconds);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Validate signature, expiry and issuer, then return the claims.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.leeway = 0;
        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(SecretString::new(secret.to_string()), "scribecare", 3600).unwrap()
    }

    fn doctor() -> User {
        User::new("Dr.Who@Example.com", "Dr Who", UserRole::Doctor, "hash".into())
    }

    #[test]
    fn test_issue_and_validate() {
        let tokens = service("test-secret");
        let user = doctor();
        let claims = tokens.validate(&tokens.issue(&user).unwrap()).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, UserRole::Doctor);
        assert_eq!(claims.email, "dr.who@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.iss, "scribecare");
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = service("secret-a").issue(&doctor()).unwrap();
        assert!(matches!(service("secret-b").validate(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = TokenService::new(SecretString::new("s".into()), "scribecare", -120).unwrap();
        let token = tokens.issue(&doctor()).unwrap();
        assert!(matches!(tokens.validate(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_foreign_issuer_is_rejected() {
        let other = TokenService::new(SecretString::new("s".into()), "elsewhere", 3600).unwrap();
        let token = other.issue(&doctor()).unwrap();
        let ours = TokenService::new(SecretString::new("s".into()), "scribecare", 3600).unwrap();
        assert!(ours.validate(&token).is_err());
    }

    #[test]
    fn test_empty_secret_is_refused() {
        assert!(matches!(
            TokenService::new(SecretString::new(String::new()), "scribecare", 60),
            Err(TokenError::EmptySecret)
        ));
    }
}
