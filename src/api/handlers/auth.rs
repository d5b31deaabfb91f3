use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};

use crate::api::response::{ok, ok_empty, ApiResponse};
use crate::api::AppState;
use crate::auth::{self, AuthUser};
use crate::error::AppError;
use crate::models::*;

fn issue_tokens(state: &AppState, user: User) -> Result<TokenPair, AppError> {
    let access_token = auth::create_jwt(&state.auth, user.id, &user.username)?;
    let refresh_token = auth::generate_refresh_token();
    let expires_at = Utc::now() + Duration::days(auth::REFRESH_TOKEN_DAYS);
    state
        .db
        .insert_refresh_token(&refresh_token, user.id, expires_at)?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        user: user.into(),
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<ApiResponse<TokenPair>>), AppError> {
    let username = input.username.trim();
    if username.len() < 3 || username.len() > 30 {
        return Err(AppError::Validation(
            "Username must be 3 to 30 characters".to_string(),
        ));
    }
    if !input.email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if input.password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let hash = auth::hash_password(&input.password)?;
    let user = state.db.create_user(username, &input.email, &hash)?;
    tracing::info!("Registered user {}", user.username);

    let tokens = issue_tokens(&state, user)?;
    Ok((StatusCode::CREATED, ok("Registered", tokens)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<ApiResponse<TokenPair>>, AppError> {
    let user = state
        .db
        .get_user_by_username(&input.username)?
        .filter(|u| auth::verify_password(&input.password, &u.password_hash))
        .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

    let tokens = issue_tokens(&state, user)?;
    Ok(ok("Logged in", tokens))
}

pub async fn login_by_email(
    State(state): State<AppState>,
    Json(input): Json<LoginByEmailInput>,
) -> Result<Json<ApiResponse<TokenPair>>, AppError> {
    let user = state
        .db
        .get_user_by_email(&input.email)?
        .filter(|u| auth::verify_password(&input.password, &u.password_hash))
        .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

    let tokens = issue_tokens(&state, user)?;
    Ok(ok("Logged in", tokens))
}

/// Exchange a refresh token for a new token pair. The old token is
/// invalidated even when it has expired, so a leaked value is single-use.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshInput>,
) -> Result<Json<ApiResponse<TokenPair>>, AppError> {
    let stored = state
        .db
        .get_refresh_token(&input.refresh_token)?
        .ok_or_else(|| AppError::Authentication("Unknown refresh token".to_string()))?;

    state.db.delete_refresh_token(&stored.token)?;

    if stored.expires_at < Utc::now() {
        return Err(AppError::Authentication(
            "Refresh token has expired".to_string(),
        ));
    }

    let user = state
        .db
        .get_user(stored.user_id)?
        .ok_or_else(|| AppError::Authentication("Account no longer exists".to_string()))?;

    let tokens = issue_tokens(&state, user)?;
    Ok(ok("Token refreshed", tokens))
}

pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state.db.delete_user_refresh_tokens(user.id)?;
    Ok(ok_empty("Logged out"))
}

pub async fn profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<UserProfile>>, AppError> {
    let user = state
        .db
        .get_user(user.id)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(ok("Profile", user.into()))
}
