use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use chrono::{NaiveDateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait, Value,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;
use crate::extractors::{CurrentUser, Json};
use crate::models::group::{self, Entity as Group};
use crate::models::group_member::{self, Entity as GroupMember};
use crate::models::transaction::{self, Entity as Transaction};
use crate::models::user::{self, Entity as User};
use crate::response::ApiResponse;

use super::AppState;

// ── Request / Response types ──

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateGroupRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupMemberInfo {
    pub id: i32,
    pub username: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupResponse {
    pub id: i32,
    pub name: String,
    pub owner_id: i32,
    pub created_at: NaiveDateTime,
    pub members: Vec<GroupMemberInfo>,
}

// ── Membership helpers (shared with analytics) ──

/// The membership row for a user, if they are in any group.
pub(crate) async fn membership_of(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Option<group_member::Model>, AppError> {
    let row = GroupMember::find()
        .filter(group_member::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(row)
}

/// Whether a user belongs to a specific group.
pub(crate) async fn is_member(
    db: &DatabaseConnection,
    group_id: i32,
    user_id: i32,
) -> Result<bool, AppError> {
    let count = GroupMember::find()
        .filter(group_member::Column::GroupId.eq(group_id))
        .filter(group_member::Column::UserId.eq(user_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

pub(crate) async fn group_response(
    db: &DatabaseConnection,
    group: group::Model,
) -> Result<GroupResponse, AppError> {
    let member_ids: Vec<i32> = GroupMember::find()
        .filter(group_member::Column::GroupId.eq(group.id))
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.user_id)
        .collect();

    let members = User::find()
        .filter(user::Column::Id.is_in(member_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| GroupMemberInfo {
            id: u.id,
            username: u.username,
            full_name: u.full_name,
        })
        .collect();

    Ok(GroupResponse {
        id: group.id,
        name: group.name,
        owner_id: group.owner_id,
        created_at: group.created_at,
        members,
    })
}

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_group))
        .route("/me", get(get_my_group))
        .route(
            "/{id}",
            get(get_group).put(update_group).delete(delete_group),
        )
}

// ── Handlers ──

/// Create a group. The creator becomes its owner and first member. A user
/// can belong to at most one group at a time.
#[utoipa::path(
    post,
    path = "/api/groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = ApiResponse<GroupResponse>),
        (status = 409, description = "Already a member of a group")
    ),
    security(("bearer_auth" = [])),
    tag = "groups"
)]
pub(crate) async fn create_group(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if membership_of(&state.db, current.id).await?.is_some() {
        return Err(AppError::Conflict(
            "You already belong to a group".to_string(),
        ));
    }

    let now = Utc::now().naive_utc();
    let txn = state.db.begin().await?;

    let created = group::ActiveModel {
        name: Set(payload.name),
        owner_id: Set(current.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    group_member::ActiveModel {
        group_id: Set(created.id),
        user_id: Set(current.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    let body = group_response(&state.db, created).await?;
    Ok((StatusCode::CREATED, ApiResponse::success(body)))
}

/// The group the current user belongs to, with its member list.
#[utoipa::path(
    get,
    path = "/api/groups/me",
    responses(
        (status = 200, description = "Current group", body = ApiResponse<GroupResponse>),
        (status = 404, description = "Not in a group")
    ),
    security(("bearer_auth" = [])),
    tag = "groups"
)]
pub(crate) async fn get_my_group(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
) -> Result<ApiResponse<GroupResponse>, AppError> {
    let membership = membership_of(&state.db, current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("You are not in a group".to_string()))?;

    let found = Group::find_by_id(membership.group_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

    Ok(ApiResponse::success(group_response(&state.db, found).await?))
}

/// A group by id. Visible only to its members; non-members get the same
/// 404 as a group that does not exist.
#[utoipa::path(
    get,
    path = "/api/groups/{id}",
    params(("id" = i32, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group", body = ApiResponse<GroupResponse>),
        (status = 404, description = "Group not found")
    ),
    security(("bearer_auth" = [])),
    tag = "groups"
)]
pub(crate) async fn get_group(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(id): Path<i32>,
) -> Result<ApiResponse<GroupResponse>, AppError> {
    let found = Group::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

    if !is_member(&state.db, found.id, current.id).await? {
        return Err(AppError::NotFound("Group not found".to_string()));
    }

    Ok(ApiResponse::success(group_response(&state.db, found).await?))
}

/// Rename a group. Owner only.
#[utoipa::path(
    put,
    path = "/api/groups/{id}",
    params(("id" = i32, Path, description = "Group id")),
    request_body = UpdateGroupRequest,
    responses(
        (status = 200, description = "Updated group", body = ApiResponse<GroupResponse>),
        (status = 403, description = "Not the group owner"),
        (status = 404, description = "Group not found")
    ),
    security(("bearer_auth" = [])),
    tag = "groups"
)]
pub(crate) async fn update_group(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateGroupRequest>,
) -> Result<ApiResponse<GroupResponse>, AppError> {
    payload.validate()?;

    let found = Group::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

    if !is_member(&state.db, found.id, current.id).await? {
        return Err(AppError::NotFound("Group not found".to_string()));
    }

    if found.owner_id != current.id {
        return Err(AppError::Forbidden(
            "Only the group owner can modify the group".to_string(),
        ));
    }

    let mut active: group::ActiveModel = found.into();
    active.name = Set(payload.name);
    active.updated_at = Set(Utc::now().naive_utc());
    let updated = active.update(&state.db).await?;

    Ok(ApiResponse::success(
        group_response(&state.db, updated).await?,
    ))
}

/// Delete a group. Owner only. Membership rows go with it; transactions
/// that referenced the group are kept but detached.
#[utoipa::path(
    delete,
    path = "/api/groups/{id}",
    params(("id" = i32, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group deleted"),
        (status = 403, description = "Not the group owner"),
        (status = 404, description = "Group not found")
    ),
    security(("bearer_auth" = [])),
    tag = "groups"
)]
pub(crate) async fn delete_group(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(id): Path<i32>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let found = Group::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

    if !is_member(&state.db, found.id, current.id).await? {
        return Err(AppError::NotFound("Group not found".to_string()));
    }

    if found.owner_id != current.id {
        return Err(AppError::Forbidden(
            "Only the group owner can delete the group".to_string(),
        ));
    }

    let txn = state.db.begin().await?;

    Transaction::update_many()
        .col_expr(transaction::Column::GroupId, Expr::value(Value::Int(None)))
        .filter(transaction::Column::GroupId.eq(found.id))
        .exec(&txn)
        .await?;

    GroupMember::delete_many()
        .filter(group_member::Column::GroupId.eq(found.id))
        .exec(&txn)
        .await?;

    Group::delete_by_id(found.id).exec(&txn).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        serde_json::json!({ "deleted": true }),
    ))
}
