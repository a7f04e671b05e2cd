use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, post};
use axum::Router;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{CurrentUser, Json};
use crate::models::group::{self, Entity as Group};
use crate::models::group_member::{self, Entity as GroupMember};
use crate::models::user::{self, Entity as User};
use crate::response::ApiResponse;

use super::groups::membership_of;
use super::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub username: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{id}/members", post(add_member))
        .route("/{id}/members/{user_id}", delete(remove_member))
}

/// Load a group and require that the current user owns it.
pub(crate) async fn owned_group(
    state: &AppState,
    group_id: i32,
    current: &user::Model,
) -> Result<group::Model, AppError> {
    let found = Group::find_by_id(group_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

    if !super::groups::is_member(&state.db, found.id, current.id).await? {
        return Err(AppError::NotFound("Group not found".to_string()));
    }

    if found.owner_id != current.id {
        return Err(AppError::Forbidden(
            "Only the group owner can manage members".to_string(),
        ));
    }

    Ok(found)
}

/// Add a user to the group by username. Owner only. The target must not
/// already belong to any group.
#[utoipa::path(
    post,
    path = "/api/groups/{id}/members",
    params(("id" = i32, Path, description = "Group id")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added"),
        (status = 403, description = "Not the group owner"),
        (status = 404, description = "Group or user not found"),
        (status = 409, description = "User already belongs to a group")
    ),
    security(("bearer_auth" = [])),
    tag = "groups"
)]
pub(crate) async fn add_member(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, AppError> {
    let group = owned_group(&state, id, &current).await?;

    let target = User::find()
        .filter(user::Column::Username.eq(&payload.username))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !target.is_active {
        return Err(AppError::BadRequest("User is inactive".to_string()));
    }

    if membership_of(&state.db, target.id).await?.is_some() {
        return Err(AppError::Conflict(
            "User already belongs to a group".to_string(),
        ));
    }

    let now = Utc::now().naive_utc();
    group_member::ActiveModel {
        group_id: Set(group.id),
        user_id: Set(target.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::success(serde_json::json!({ "added": target.username })),
    ))
}

/// Remove a member from the group. Owner only; the owner cannot remove
/// themselves (delete the group instead).
#[utoipa::path(
    delete,
    path = "/api/groups/{id}/members/{user_id}",
    params(
        ("id" = i32, Path, description = "Group id"),
        ("user_id" = i32, Path, description = "User id of the member to remove")
    ),
    responses(
        (status = 200, description = "Member removed"),
        (status = 400, description = "Owner cannot remove themselves"),
        (status = 403, description = "Not the group owner"),
        (status = 404, description = "Group or member not found")
    ),
    security(("bearer_auth" = [])),
    tag = "groups"
)]
pub(crate) async fn remove_member(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path((id, user_id)): Path<(i32, i32)>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let group = owned_group(&state, id, &current).await?;

    if user_id == group.owner_id {
        return Err(AppError::BadRequest(
            "The owner cannot leave their own group; delete it instead".to_string(),
        ));
    }

    let membership = GroupMember::find()
        .filter(group_member::Column::GroupId.eq(group.id))
        .filter(group_member::Column::UserId.eq(user_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    membership.delete(&state.db).await?;

    Ok(ApiResponse::success(serde_json::json!({ "removed": true })))
}
