use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use database_layer::{Filter, User, UserRole};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::MIN_PASSWORD_LENGTH;
use crate::error::{api_success, ApiError, ApiErrorResponse, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::ScribeServer;
use crate::validation::RequestValidation;

/// Registration request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "dr.lee@clinic.example")]
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: UserRole,
    pub specialization: Option<String>,
}

impl RequestValidation for RegisterRequest {
    fn validate(&self) -> Result<(), ApiError> {
        crate::validate_email!(self.email, "A valid email address is required");
        crate::validate_required!(self.name, "Name is required");
        crate::validate_length!(self.name, 1, 200, "Name must be at most 200 characters");
        crate::validate_field!(
            self.password,
            self.password.chars().count() >= MIN_PASSWORD_LENGTH,
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters")
        );
        crate::validate_optional!(self.specialization, "Specialization cannot be blank");
        Ok(())
    }
}

/// Authentication request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Authentication response
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

/// Public view of a user account.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub specialization: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            specialization: user.specialization,
            created_at: user.created_at,
        }
    }
}

fn token_response(server: &ScribeServer, user: User) -> ApiResult<AuthResponse> {
    let token = server
        .tokens
        .issue(&user)
        .map_err(|e| ApiError::internal(format!("token issue: {e}")))?;
    Ok(AuthResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: server.tokens.ttl_seconds(),
        user: user.into(),
    })
}

async fn find_by_email(server: &ScribeServer, email: &str) -> ApiResult<Option<User>> {
    let filter = Filter::new().eq("email", email.trim().to_lowercase())?;
    Ok(server.db.users.find_one(filter).await?)
}

/// Create a doctor or patient account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid request", body = ApiErrorResponse),
        (status = 409, description = "Email already registered", body = ApiErrorResponse)
    ),
    tag = "authentication"
)]
#[tracing::instrument(skip(server, request), fields(role = request.role.as_str()))]
pub async fn register(
    State(server): State<ScribeServer>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    request.validate()?;

    if find_by_email(&server, &request.email).await?.is_some() {
        return Err(ApiError::conflict("An account with this email already exists"));
    }

    let hash = server
        .passwords
        .hash(&request.password)
        .await
        .map_err(|e| ApiError::internal(format!("password hash: {e}")))?;
    let mut user = User::new(&request.email, &request.name, request.role, hash);
    user.specialization = request.specialization.map(|s| s.trim().to_string());
    server.db.users.insert(&user).await?;

    info!(user_id = %user.id, "Account registered");
    let response = token_response(&server, user)?;
    Ok((StatusCode::CREATED, Json(api_success(response))))
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ApiErrorResponse)
    ),
    tag = "authentication"
)]
#[tracing::instrument(skip_all)]
pub async fn login(
    State(server): State<ScribeServer>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<ApiResponse<AuthResponse>>> {
    let invalid = || ApiError::authentication("Invalid email or password");
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(invalid());
    }

    let user = find_by_email(&server, &request.email).await?.ok_or_else(invalid)?;
    let verified = server
        .passwords
        .verify(&request.password, &user.password_hash)
        .await
        .map_err(|e| ApiError::internal(format!("password verify: {e}")))?;
    if !verified {
        return Err(invalid());
    }

    info!(user_id = %user.id, "Login succeeded");
    Ok(Json(api_success(token_response(&server, user)?)))
}

/// The calling user's profile
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse)
    ),
    tag = "authentication",
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(server): State<ScribeServer>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<UserProfile>>> {
    let user = server
        .db
        .users
        .get(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::authentication("Account no longer exists"))?;
    Ok(Json(api_success(user.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: "Dr. Lee".to_string(),
            role: UserRole::Doctor,
            specialization: None,
        }
    }

    #[test]
    fn test_register_validation() {
        assert!(request("dr.lee@clinic.example", "long-enough").validate().is_ok());
        assert!(request("not-an-email", "long-enough").validate().is_err());
        assert!(request("dr.lee@clinic.example", "short").validate().is_err());

        let mut blank_specialization = request("dr.lee@clinic.example", "long-enough");
        blank_specialization.specialization = Some("  ".into());
        assert!(blank_specialization.validate().is_err());
    }
}
