use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Router;
use sea_orm::EntityTrait;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::models::group::Entity as Group;
use crate::response::ApiResponse;
use crate::services::analytics::{
    self, AnalyticsSummary, GroupAnalyticsSummary, parse_period,
};

use super::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PeriodQuery {
    /// Month to summarize, `YYYY-MM`. Defaults to the current month.
    pub period: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(my_summary))
        .route("/groups/{id}", get(group_summary))
}

/// Monthly summary of the current user's transactions.
#[utoipa::path(
    get,
    path = "/api/analytics",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Summary", body = ApiResponse<AnalyticsSummary>),
        (status = 422, description = "Malformed period")
    ),
    security(("bearer_auth" = [])),
    tag = "analytics"
)]
pub(crate) async fn my_summary(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Query(query): Query<PeriodQuery>,
) -> Result<ApiResponse<AnalyticsSummary>, AppError> {
    let period = parse_period(query.period.as_deref())?;
    let summary = analytics::user_summary(&state.db, current.id, &period).await?;
    Ok(ApiResponse::success(summary))
}

/// Monthly summary of a group's transactions. Members only.
#[utoipa::path(
    get,
    path = "/api/analytics/groups/{id}",
    params(("id" = i32, Path, description = "Group id"), PeriodQuery),
    responses(
        (status = 200, description = "Group summary", body = ApiResponse<GroupAnalyticsSummary>),
        (status = 403, description = "Not a member of the group"),
        (status = 404, description = "Group not found")
    ),
    security(("bearer_auth" = [])),
    tag = "analytics"
)]
pub(crate) async fn group_summary(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(id): Path<i32>,
    Query(query): Query<PeriodQuery>,
) -> Result<ApiResponse<GroupAnalyticsSummary>, AppError> {
    let period = parse_period(query.period.as_deref())?;

    let group = Group::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

    if !super::groups::is_member(&state.db, group.id, current.id).await? {
        return Err(AppError::Forbidden(
            "You are not a member of that group".to_string(),
        ));
    }

    let summary = analytics::group_summary(&state.db, group.id, &period).await?;
    Ok(ApiResponse::success(summary))
}
