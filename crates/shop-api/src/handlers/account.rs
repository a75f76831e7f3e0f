//! Account handlers: registration, login, token refresh, profile.

use crate::auth::{
    self, hash_password, issue_access_token, issue_refresh_token, verify_password, AuthUser,
};
use crate::handlers::{store_error_to_response, ErrorResponse};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use shop_core::StoreError;
use shop_db::{NewUser, ProfileUpdate, User};
use tracing::{error, info, instrument};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Tokens plus the user they were issued for
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl TokenResponse {
    fn issue(user: User, state: &AppState) -> Result<Self, (StatusCode, Json<ErrorResponse>)> {
        let access_token = issue_access_token(&user, &state.config.access_token_secret)
            .map_err(store_error_to_response)?;
        let refresh_token = issue_refresh_token(user.id, &state.config.refresh_token_secret)
            .map_err(store_error_to_response)?;
        Ok(Self {
            user,
            access_token,
            refresh_token,
            expires_in: auth::ACCESS_TOKEN_TTL_SECS,
        })
    }
}

fn validate_registration(request: &RegisterRequest) -> Result<(), StoreError> {
    if request.username.trim().is_empty() {
        return Err(StoreError::InvalidRequest(
            "Username must not be empty".to_string(),
        ));
    }
    if !request.email.contains('@') {
        return Err(StoreError::InvalidRequest(
            "Email address is not valid".to_string(),
        ));
    }
    if request.password.len() < 8 {
        return Err(StoreError::InvalidRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a new account and issue tokens
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    validate_registration(&request).map_err(store_error_to_response)?;

    let password_hash = hash_password(&request.password).map_err(store_error_to_response)?;

    let user = state
        .store
        .create_user(&NewUser {
            username: request.username.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            password_hash,
            phone: request.phone,
        })
        .await
        .map_err(store_error_to_response)?;

    info!("Registered user {}", user.id);

    let tokens = TokenResponse::issue(user, &state)?;
    Ok((StatusCode::CREATED, Json(tokens)))
}

/// Log in with email and password
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, (StatusCode, Json<ErrorResponse>)> {
    let user = state
        .store
        .find_user_by_email(&request.email.trim().to_lowercase())
        .await
        .map_err(store_error_to_response)?
        .ok_or_else(|| store_error_to_response(StoreError::InvalidCredentials))?;

    let matches =
        verify_password(&request.password, &user.password_hash).map_err(store_error_to_response)?;
    if !matches {
        return Err(store_error_to_response(StoreError::InvalidCredentials));
    }

    info!("User {} logged in", user.id);

    Ok(Json(TokenResponse::issue(user, &state)?))
}

/// Exchange a refresh token for a fresh token pair
#[instrument(skip(state, request))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, (StatusCode, Json<ErrorResponse>)> {
    let claims =
        auth::verify_refresh_token(&request.refresh_token, &state.config.refresh_token_secret)
            .map_err(store_error_to_response)?;

    let user_id = claims.sub.parse().map_err(|_| {
        store_error_to_response(StoreError::Unauthorized(
            "Malformed token subject".to_string(),
        ))
    })?;

    let user = state
        .store
        .find_user(user_id)
        .await
        .map_err(store_error_to_response)?;

    Ok(Json(TokenResponse::issue(user, &state)?))
}

/// Stateless logout acknowledgement; clients discard their tokens
pub async fn logout() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Logged out" }))
}

/// The authenticated user's profile
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<User>, (StatusCode, Json<ErrorResponse>)> {
    let user = state
        .store
        .find_user(user.user_id)
        .await
        .map_err(store_error_to_response)?;
    Ok(Json(user))
}

/// Update profile fields; omitted fields are unchanged
#[instrument(skip(state, request), fields(user_id = %user.user_id))]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<User>, (StatusCode, Json<ErrorResponse>)> {
    if let Some(email) = &request.email {
        if !email.contains('@') {
            return Err(store_error_to_response(StoreError::InvalidRequest(
                "Email address is not valid".to_string(),
            )));
        }
    }

    let updated = state
        .store
        .update_profile(
            user.user_id,
            &ProfileUpdate {
                username: request.username,
                email: request.email.map(|e| e.trim().to_lowercase()),
                phone: request.phone,
            },
        )
        .await
        .map_err(|e| {
            error!("Profile update failed: {}", e);
            store_error_to_response(e)
        })?;

    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> RegisterRequest {
        RegisterRequest {
            username: "mona".to_string(),
            email: "mona@example.com".to_string(),
            password: "s3cret-pass".to_string(),
            phone: None,
        }
    }

    #[test]
    fn test_registration_validation() {
        assert!(validate_registration(&valid_request()).is_ok());

        let mut bad = valid_request();
        bad.username = "   ".to_string();
        assert!(validate_registration(&bad).is_err());

        let mut bad = valid_request();
        bad.email = "not-an-email".to_string();
        assert!(validate_registration(&bad).is_err());

        let mut bad = valid_request();
        bad.password = "short".to_string();
        assert!(validate_registration(&bad).is_err());
    }
}
