//! Authentication context extraction
//!
//! Handlers take an [`AuthContext`] argument; extraction validates the bearer
//! token and rejects the request with 401 before the handler runs.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use database_layer::UserRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{TokenClaims, TokenError};
use crate::error::ApiError;
use crate::server::ScribeServer;

/// Authentication context extracted from the JWT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: UserRole,
    pub email: String,
    pub name: String,
}

impl AuthContext {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self {
            user_id,
            role,
            email: String::new(),
            name: String::new(),
        }
    }

    pub fn is_doctor(&self) -> bool {
        self.role == UserRole::Doctor
    }

    /// 403 unless the caller is a doctor.
    pub fn require_doctor(&self) -> Result<(), ApiError> {
        self.require_role(UserRole::Doctor)
    }

    /// 403 unless the caller is a patient.
    pub fn require_patient(&self) -> Result<(), ApiError> {
        self.require_role(UserRole::Patient)
    }

    fn require_role(&self, role: UserRole) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::authorization(format!(
                "This operation requires the {} role",
                role.as_str()
            )))
        }
    }
}

impl From<TokenClaims> for AuthContext {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            email: claims.email,
            name: claims.name,
        }
    }
}

/// Extract the bearer token from the Authorization header
fn extract_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::authentication("Missing Authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ApiError::authentication("Invalid Authorization header format. Expected: Bearer <token>")
        })
}

#[async_trait]
impl FromRequestParts<ScribeServer> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        server: &ScribeServer,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)?;
        let claims = server.tokens.validate(token).map_err(|e| match e {
            TokenError::Expired => ApiError::authentication("Token has expired"),
            _ => ApiError::authentication("Invalid token"),
        })?;
        Ok(claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/notes");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_extract_token_strips_bearer_prefix() {
        assert_eq!(extract_token(&parts(Some("Bearer abc.def"))).unwrap(), "abc.def");
    }

    #[test]
    fn test_extract_token_rejects_other_schemes() {
        assert!(extract_token(&parts(Some("Basic dXNlcjpwYXNz"))).is_err());
        assert!(extract_token(&parts(Some("Bearer   "))).is_err());
        assert!(extract_token(&parts(None)).is_err());
    }

    #[test]
    fn test_role_guards() {
        let doctor = AuthContext::new(Uuid::new_v4(), UserRole::Doctor);
        assert!(doctor.require_doctor().is_ok());
        let err = doctor.require_patient().unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }
}
