use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{create_token, hash_password, validate_credentials, verify_password};
use crate::error::MagitechError;
use crate::extractors::{AuthUser, Json};
use crate::models::user::{self, Entity as User, UserResponse};
use crate::response::ApiResponse;

use super::AppState;

// ── Request / Response types ──

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: UserResponse,
}

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

// ── Handlers ──

/// Register a new account.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User created", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username taken")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ApiResponse<AuthResponse>, MagitechError> {
    validate_credentials(&payload.username, &payload.password)?;
    let username = payload.username.trim().to_string();

    let existing = User::find()
        .filter(user::Column::Username.eq(&username))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(MagitechError::Conflict("Username already exists".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user_model = user::ActiveModel {
        username: Set(username),
        password_hash: Set(password_hash),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(user_id = user_model.id, "registered {}", user_model.username);

    let token = create_token(
        user_model.id,
        &user_model.username,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    Ok(ApiResponse::success(AuthResponse {
        access_token: token,
        user: UserResponse::from(user_model),
    }))
}

/// Log in with existing credentials.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<ApiResponse<AuthResponse>, MagitechError> {
    let invalid = || MagitechError::Unauthorized("Invalid username or password".to_string());

    let user_model = User::find()
        .filter(user::Column::Username.eq(payload.username.trim()))
        .one(&state.db)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user_model.password_hash) {
        tracing::info!(user_id = user_model.id, "failed login");
        return Err(invalid());
    }

    let token = create_token(
        user_model.id,
        &user_model.username,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    Ok(ApiResponse::success(AuthResponse {
        access_token: token,
        user: UserResponse::from(user_model),
    }))
}

/// The authenticated user.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserResponse>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ApiResponse<UserResponse>, MagitechError> {
    let user_model = User::find_by_id(user.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| MagitechError::NotFound("User not found".to_string()))?;
    Ok(ApiResponse::success(UserResponse::from(user_model)))
}
