//! Password hashing, access/refresh token issuance, and the request
//! extractor that authenticates API calls.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::AppState;
use crate::error::AppError;

/// Access tokens are short-lived; clients refresh with the opaque token.
const ACCESS_TOKEN_MINUTES: i64 = 15;
/// Refresh tokens live in the database and survive for 30 days.
pub const REFRESH_TOKEN_DAYS: i64 = 30;

/// Signing configuration, injected through [`AppState`].
#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn from_env() -> Self {
        let secret = std::env::var("POMOTRACK_JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("POMOTRACK_JWT_SECRET not set, using an ephemeral secret");
            Uuid::new_v4().to_string()
        });
        Self { secret }
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            AppError::Internal
        })
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    pub username: String,
    /// Expiry, seconds since the epoch.
    pub exp: usize,
}

pub fn create_jwt(config: &AuthConfig, user_id: Uuid, username: &str) -> Result<String, AppError> {
    let expiration = Utc::now() + Duration::minutes(ACCESS_TOKEN_MINUTES);
    let claims = Claims {
        sub: user_id,
        username: username.to_owned(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("JWT encoding failed: {}", e);
        AppError::Internal
    })
}

pub fn verify_jwt(config: &AuthConfig, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("JWT verification failed: {}", e);
        AppError::Authentication("Token is expired or invalid".to_string())
    })
}

/// Mint an opaque refresh token. The value is random; validity lives in the
/// `refresh_tokens` table.
pub fn generate_refresh_token() -> String {
    Uuid::new_v4().to_string()
}

/// The authenticated caller. Handlers take `user: AuthUser` to require a
/// valid bearer token; the extractor also confirms the account still exists.
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Authentication("Missing or malformed bearer token".into()))?;

        let claims = verify_jwt(&state.auth, bearer.token())?;

        // Tokens can outlive their account.
        let user = state
            .db
            .get_user(claims.sub)?
            .ok_or_else(|| AppError::Authentication("Account no longer exists".into()))?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
        })
    }
}
