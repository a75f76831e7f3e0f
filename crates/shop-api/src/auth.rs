//! # Authentication
//!
//! Argon2 password hashing and HS256 JWT issuing/verification, plus the
//! `AuthUser` extractor that guards authenticated routes. Access tokens
//! are short-lived; refresh tokens only carry the subject.

use crate::handlers::ErrorResponse;
use crate::state::AppState;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::FromRequestParts, http::request::Parts, http::StatusCode, Json};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use shop_core::{StoreError, StoreResult};
use shop_db::User;
use uuid::Uuid;

/// Access token lifetime in seconds (15 minutes)
pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
/// Refresh token lifetime in seconds (7 days)
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

// =============================================================================
// Passwords
// =============================================================================

/// Hash a password with Argon2id and a fresh salt
pub fn hash_password(password: &str) -> StoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StoreError::Internal(format!("Password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2 hash
pub fn verify_password(password: &str, stored_hash: &str) -> StoreResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| StoreError::Internal(format!("Stored hash is malformed: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

// =============================================================================
// Tokens
// =============================================================================

/// Claims carried by an access token
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User ID
    pub sub: String,
    pub username: String,
    pub email: String,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// Claims carried by a refresh token
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// User ID
    pub sub: String,
    /// Expiry (unix seconds)
    pub exp: i64,
}

pub fn issue_access_token(user: &User, secret: &str) -> StoreResult<String> {
    let claims = AccessClaims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        email: user.email.clone(),
        exp: (Utc::now() + Duration::seconds(ACCESS_TOKEN_TTL_SECS)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| StoreError::Internal(format!("Token signing failed: {e}")))
}

pub fn issue_refresh_token(user_id: Uuid, secret: &str) -> StoreResult<String> {
    let claims = RefreshClaims {
        sub: user_id.to_string(),
        exp: (Utc::now() + Duration::seconds(REFRESH_TOKEN_TTL_SECS)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| StoreError::Internal(format!("Token signing failed: {e}")))
}

pub fn verify_access_token(token: &str, secret: &str) -> StoreResult<AccessClaims> {
    decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| StoreError::Unauthorized("Invalid or expired access token".to_string()))
}

pub fn verify_refresh_token(token: &str, secret: &str) -> StoreResult<RefreshClaims> {
    decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| StoreError::Unauthorized("Invalid or expired refresh token".to_string()))
}

// =============================================================================
// Extractor
// =============================================================================

/// The authenticated caller, extracted from `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let unauthorized = |msg: &str| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new(msg, 401)),
            )
        };

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| unauthorized("Authorization header must be a Bearer token"))?;

        let claims = verify_access_token(token, &state.config.access_token_secret)
            .map_err(|e| unauthorized(&e.to_string()))?;

        let user_id = claims
            .sub
            .parse::<Uuid>()
            .map_err(|_| unauthorized("Malformed token subject"))?;

        Ok(AuthUser {
            user_id,
            username: claims.username,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "mona".to_string(),
            email: "mona@example.com".to_string(),
            password_hash: String::new(),
            phone: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret-pass", &hash).unwrap());
        assert!(!verify_password("wrong-pass", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_access_token_roundtrip() {
        let user = test_user();
        let token = issue_access_token(&user, "access-secret").unwrap();
        let claims = verify_access_token(&token, "access-secret").unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.username, "mona");
        assert_eq!(claims.email, "mona@example.com");
    }

    #[test]
    fn test_token_rejects_wrong_secret() {
        let user = test_user();
        let token = issue_access_token(&user, "access-secret").unwrap();
        assert!(verify_access_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_refresh_token_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = issue_refresh_token(user_id, "refresh-secret").unwrap();
        let claims = verify_refresh_token(&token, "refresh-secret").unwrap();
        assert_eq!(claims.sub, user_id.to_string());
    }

    #[test]
    fn test_access_token_is_not_a_refresh_secret_token() {
        let user = test_user();
        let token = issue_access_token(&user, "access-secret").unwrap();
        assert!(verify_refresh_token(&token, "refresh-secret").is_err());
    }
}
