use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::Router;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;
use crate::extractors::{CurrentUser, Json};
use crate::models::user::{self, Entity as User, UserResponse};
use crate::response::ApiResponse;

use super::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMeRequest {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 200))]
    pub full_name: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me", put(update_me))
        .route("/{id}", get(get_user))
}

/// The authenticated user's own profile.
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub(crate) async fn get_me(CurrentUser(current): CurrentUser) -> ApiResponse<UserResponse> {
    ApiResponse::success(UserResponse::from(current))
}

/// Update the authenticated user's email or display name.
#[utoipa::path(
    put,
    path = "/api/users/me",
    request_body = UpdateMeRequest,
    responses(
        (status = 200, description = "Updated user", body = ApiResponse<UserResponse>),
        (status = 409, description = "Email already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub(crate) async fn update_me(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    payload.validate()?;

    let mut active: user::ActiveModel = current.clone().into();

    if let Some(email) = payload.email {
        if email != current.email {
            let taken = User::find()
                .filter(user::Column::Email.eq(&email))
                .one(&state.db)
                .await?;
            if taken.is_some() {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
        }
        active.email = Set(email);
    }

    if let Some(full_name) = payload.full_name {
        active.full_name = Set(Some(full_name));
    }

    active.updated_at = Set(Utc::now().naive_utc());
    let updated = active.update(&state.db).await?;

    Ok(ApiResponse::success(UserResponse::from(updated)))
}

/// Look up another user's public profile by id.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub(crate) async fn get_user(
    State(state): State<AppState>,
    CurrentUser(_current): CurrentUser,
    Path(id): Path<i32>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let found = User::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::success(UserResponse::from(found)))
}
