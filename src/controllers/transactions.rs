use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::{Days, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::AppError;
use crate::extractors::{CurrentUser, Json, Pagination};
use crate::models::transaction::{self, Entity as Transaction, TransactionKind};
use crate::models::user;
use crate::response::ApiResponse;

use super::AppState;

// ── Request / Response types ──

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTransactionRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub amount: f64,
    pub kind: TransactionKind,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub group_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateTransactionRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub amount: Option<f64>,
    pub kind: Option<TransactionKind>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
}

/// List filters. Dates are `YYYY-MM-DD`; unparsable values are ignored
/// rather than rejected.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TransactionFilter {
    pub category: Option<String>,
    pub kind: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionListResponse {
    pub items: Vec<transaction::Model>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub pages: u64,
}

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transactions).post(create_transaction))
        .route(
            "/{id}",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
}

fn require_positive_amount(amount: f64) -> Result<(), AppError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::Validation(
            "Amount must be a positive number".to_string(),
        ));
    }
    Ok(())
}

/// Scope a query to the current user's transactions.
fn owned_by(user_id: i32) -> Select<Transaction> {
    Transaction::find().filter(transaction::Column::UserId.eq(user_id))
}

pub(crate) async fn owned_transaction(
    state: &AppState,
    id: i32,
    current: &user::Model,
) -> Result<transaction::Model, AppError> {
    owned_by(current.id)
        .filter(transaction::Column::Id.eq(id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))
}

// ── Handlers ──

/// Record an income or expense. If `group_id` is set the user must be a
/// member of that group.
#[utoipa::path(
    post,
    path = "/api/transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction created", body = ApiResponse<transaction::Model>),
        (status = 403, description = "Not a member of the given group"),
        (status = 422, description = "Invalid input")
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub(crate) async fn create_transaction(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    require_positive_amount(payload.amount)?;

    if let Some(group_id) = payload.group_id {
        if !super::groups::is_member(&state.db, group_id, current.id).await? {
            return Err(AppError::Forbidden(
                "You are not a member of that group".to_string(),
            ));
        }
    }

    let now = Utc::now().naive_utc();
    let created = transaction::ActiveModel {
        user_id: Set(current.id),
        group_id: Set(payload.group_id),
        title: Set(payload.title),
        amount: Set(payload.amount),
        description: Set(payload.description),
        category: Set(payload.category),
        kind: Set(payload.kind),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, ApiResponse::success(created)))
}

/// The current user's transactions, newest first, with optional category,
/// kind, and date-range filters.
#[utoipa::path(
    get,
    path = "/api/transactions",
    params(TransactionFilter, Pagination),
    responses(
        (status = 200, description = "Transactions", body = ApiResponse<TransactionListResponse>)
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub(crate) async fn list_transactions(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Query(filter): Query<TransactionFilter>,
    pagination: Pagination,
) -> Result<ApiResponse<TransactionListResponse>, AppError> {
    let mut query = owned_by(current.id);

    if let Some(category) = &filter.category {
        query = query.filter(transaction::Column::Category.eq(category));
    }

    if let Some(kind) = filter.kind.as_deref() {
        match kind {
            "income" => query = query.filter(transaction::Column::Kind.eq(TransactionKind::Income)),
            "expense" => {
                query = query.filter(transaction::Column::Kind.eq(TransactionKind::Expense))
            }
            _ => {}
        }
    }

    if let Some(start) = filter
        .start_date
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    {
        query = query.filter(
            transaction::Column::CreatedAt.gte(start.and_hms_opt(0, 0, 0).unwrap_or_default()),
        );
    }

    if let Some(end) = filter
        .end_date
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .and_then(|d| d.checked_add_days(Days::new(1)))
    {
        query = query
            .filter(transaction::Column::CreatedAt.lt(end.and_hms_opt(0, 0, 0).unwrap_or_default()));
    }

    let total = query.clone().count(&state.db).await?;

    let items = query
        .order_by_desc(transaction::Column::CreatedAt)
        .order_by_desc(transaction::Column::Id)
        .offset(pagination.offset())
        .limit(pagination.page_size)
        .all(&state.db)
        .await?;

    let pages = total.div_ceil(pagination.page_size);

    Ok(ApiResponse::success(TransactionListResponse {
        items,
        total,
        page: pagination.page,
        page_size: pagination.page_size,
        pages,
    }))
}

/// A single transaction. Only the owner can see it.
#[utoipa::path(
    get,
    path = "/api/transactions/{id}",
    params(("id" = i32, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction", body = ApiResponse<transaction::Model>),
        (status = 404, description = "Transaction not found")
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub(crate) async fn get_transaction(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(id): Path<i32>,
) -> Result<ApiResponse<transaction::Model>, AppError> {
    let found = owned_transaction(&state, id, &current).await?;
    Ok(ApiResponse::success(found))
}

/// Update a transaction's fields. Only the owner can modify it; the group
/// tag is fixed at creation.
#[utoipa::path(
    put,
    path = "/api/transactions/{id}",
    params(("id" = i32, Path, description = "Transaction id")),
    request_body = UpdateTransactionRequest,
    responses(
        (status = 200, description = "Updated transaction", body = ApiResponse<transaction::Model>),
        (status = 404, description = "Transaction not found")
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub(crate) async fn update_transaction(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateTransactionRequest>,
) -> Result<ApiResponse<transaction::Model>, AppError> {
    payload.validate()?;

    let found = owned_transaction(&state, id, &current).await?;
    let mut active: transaction::ActiveModel = found.into();

    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(amount) = payload.amount {
        require_positive_amount(amount)?;
        active.amount = Set(amount);
    }
    if let Some(kind) = payload.kind {
        active.kind = Set(kind);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(category) = payload.category {
        active.category = Set(Some(category));
    }

    active.updated_at = Set(Utc::now().naive_utc());
    let updated = active.update(&state.db).await?;

    Ok(ApiResponse::success(updated))
}

/// Delete a transaction. Only the owner can delete it.
#[utoipa::path(
    delete,
    path = "/api/transactions/{id}",
    params(("id" = i32, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction deleted"),
        (status = 404, description = "Transaction not found")
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub(crate) async fn delete_transaction(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(id): Path<i32>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let found = owned_transaction(&state, id, &current).await?;
    found.delete(&state.db).await?;

    Ok(ApiResponse::success(serde_json::json!({ "deleted": true })))
}
