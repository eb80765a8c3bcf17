//! Registration, login and the current account.
//!
//! ## Bootstrap Admin
//! With `auth.bootstrap_admin` on, an account registered while no admin
//! exists is created as admin. Every later account is a customer.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use storefront_core::validation::{validate_email, validate_password, validate_user_name};
use storefront_core::{new_id, normalize_email, Role, User};

use crate::auth::{hash_password, verify_password, AuthError, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::response::{ApiJson, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&req.email);
    let name = req.name.trim().to_string();
    validate_email(&email)?;
    validate_user_name(&name)?;
    validate_password(&req.password)?;

    let role = if state.config.auth.bootstrap_admin && state.db.users().count_admins().await? == 0 {
        Role::Admin
    } else {
        Role::Customer
    };

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(format!("Hashing task failed: {}", e)))??;

    let user = User {
        id: new_id(),
        email,
        name,
        password_hash,
        role,
        created_at: Utc::now(),
    };
    state.db.users().insert(&user).await?;

    let token = state.jwt.issue(&user.id, user.role)?;
    info!(user_id = %user.id, role = ?user.role, "User registered");

    Ok((StatusCode::CREATED, ApiResponse::ok(AuthPayload { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<ApiResponse<AuthPayload>> {
    let user = match state.db.users().get_by_email(&req.email).await? {
        Some(user) => user,
        None => {
            warn!("Login attempt for unknown email");
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    let hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&req.password, &hash))
        .await
        .map_err(|e| ApiError::internal(format!("Verification task failed: {}", e)))?;

    if !verified {
        warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = state.jwt.issue(&user.id, user.role)?;
    info!(user_id = %user.id, "User logged in");

    Ok(ApiResponse::ok(AuthPayload { token, user }))
}

pub async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<ApiResponse<User>> {
    let user = state
        .db
        .users()
        .get_by_id(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    Ok(ApiResponse::ok(user))
}
