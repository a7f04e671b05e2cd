use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, SqlErr};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{hash_password, verify_password, TokenPair};
use crate::error::AppError;
use crate::extractors::{CurrentUser, Json};
use crate::models::user::{self, Entity as User, UserResponse};
use crate::response::ApiResponse;

use super::AppState;

// ── Request / Response types ──

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(max = 200))]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Username or email address.
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
        .route("/change-password", post(change_password))
        .route("/logout", post(logout))
}

// ── Handlers ──

/// Register a new user account. The new user is logged in immediately:
/// the response carries a fresh token pair.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created and logged in", body = ApiResponse<LoginResponse>),
        (status = 409, description = "Username or email already taken"),
        (status = 422, description = "Invalid input")
    ),
    tag = "auth"
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.password.len() < state.config.min_password_length {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            state.config.min_password_length
        )));
    }

    let existing = User::find()
        .filter(
            user::Column::Username
                .eq(&payload.username)
                .or(user::Column::Email.eq(&payload.email)),
        )
        .one(&state.db)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(
            "Username or email already registered".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let now = Utc::now().naive_utc();

    let new_user = user::ActiveModel {
        username: Set(payload.username),
        email: Set(payload.email),
        full_name: Set(payload.full_name),
        password_hash: Set(password_hash),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    // The uniqueness pre-check above can race a concurrent registration;
    // the unique index is the authority.
    let user_model = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Username or email already registered".to_string())
        }
        _ => AppError::from(e),
    })?;

    let pair = state
        .auth
        .generate_tokens(&state.db, &user_model)
        .await
        .map_err(|e| e.into_response_error("Not authenticated"))?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::success(LoginResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "bearer".to_string(),
            user: UserResponse::from(user_model),
        }),
    ))
}

/// Log in with username (or email) and password.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    let user_model = state
        .auth
        .authenticate_user(&state.db, &payload.username, &payload.password)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Incorrect username or password".to_string()))?;

    let pair = state
        .auth
        .generate_tokens(&state.db, &user_model)
        .await
        .map_err(|e| e.into_response_error("Incorrect username or password"))?;

    Ok(ApiResponse::success(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "bearer".to_string(),
        user: UserResponse::from(user_model),
    }))
}

/// Exchange a refresh token for a new token pair. The presented token is
/// revoked; a given refresh token is redeemable exactly once.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = ApiResponse<TokenPair>),
        (status = 401, description = "Invalid or expired refresh token")
    ),
    tag = "auth"
)]
pub(crate) async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<ApiResponse<TokenPair>, AppError> {
    let pair = state
        .auth
        .refresh_access_token(&state.db, &payload.refresh_token)
        .await
        .map_err(|e| e.into_response_error("Invalid or expired refresh token"))?;

    Ok(ApiResponse::success(pair))
}

/// Change the current user's password. All refresh tokens are revoked so
/// other sessions must log in again.
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<MessageResponse>),
        (status = 401, description = "Current password is wrong")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub(crate) async fn change_password(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<ApiResponse<MessageResponse>, AppError> {
    payload.validate()?;

    if !verify_password(&payload.current_password, &current.password_hash)? {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let new_hash = hash_password(&payload.new_password)?;

    let mut active: user::ActiveModel = current.clone().into();
    active.password_hash = Set(new_hash);
    active.updated_at = Set(Utc::now().naive_utc());
    active.update(&state.db).await?;

    crate::auth::refresh::revoke_all_for_user(&state.db, current.id).await?;

    Ok(ApiResponse::success(MessageResponse {
        message: "Password updated".to_string(),
    }))
}

/// Log out everywhere by revoking all of the user's refresh tokens.
/// Outstanding access tokens stay valid until they expire.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = ApiResponse<MessageResponse>),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub(crate) async fn logout(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
) -> Result<ApiResponse<MessageResponse>, AppError> {
    crate::auth::refresh::revoke_all_for_user(&state.db, current.id).await?;

    Ok(ApiResponse::success(MessageResponse {
        message: "Logged out".to_string(),
    }))
}
