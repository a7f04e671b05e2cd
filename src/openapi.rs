use utoipa::OpenApi;

use crate::auth::TokenPair;
use crate::controllers::auth::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse, RefreshRequest,
    RegisterRequest,
};
use crate::controllers::group_members::AddMemberRequest;
use crate::controllers::groups::{
    CreateGroupRequest, GroupMemberInfo, GroupResponse, UpdateGroupRequest,
};
use crate::controllers::transactions::{
    CreateTransactionRequest, TransactionListResponse, UpdateTransactionRequest,
};
use crate::controllers::users::UpdateMeRequest;
use crate::models::transaction::TransactionKind;
use crate::models::user::UserResponse;
use crate::services::analytics::{AnalyticsSummary, GroupAnalyticsSummary};

/// Generated OpenAPI documentation, served at `/api-docs`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "SmartSpend API",
        version = "0.1.0",
        description = "Shared expense tracking: accounts, groups, transactions, and monthly analytics."
    ),
    paths(
        crate::controllers::auth::register,
        crate::controllers::auth::login,
        crate::controllers::auth::refresh_token,
        crate::controllers::auth::change_password,
        crate::controllers::auth::logout,
        crate::controllers::users::get_me,
        crate::controllers::users::update_me,
        crate::controllers::users::get_user,
        crate::controllers::groups::create_group,
        crate::controllers::groups::get_my_group,
        crate::controllers::groups::get_group,
        crate::controllers::groups::update_group,
        crate::controllers::groups::delete_group,
        crate::controllers::group_members::add_member,
        crate::controllers::group_members::remove_member,
        crate::controllers::transactions::create_transaction,
        crate::controllers::transactions::list_transactions,
        crate::controllers::transactions::get_transaction,
        crate::controllers::transactions::update_transaction,
        crate::controllers::transactions::delete_transaction,
        crate::controllers::analytics::my_summary,
        crate::controllers::analytics::group_summary,
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            RefreshRequest,
            ChangePasswordRequest,
            MessageResponse,
            TokenPair,
            UserResponse,
            UpdateMeRequest,
            CreateGroupRequest,
            UpdateGroupRequest,
            GroupResponse,
            GroupMemberInfo,
            AddMemberRequest,
            CreateTransactionRequest,
            UpdateTransactionRequest,
            TransactionListResponse,
            TransactionKind,
            AnalyticsSummary,
            GroupAnalyticsSummary,
        )
    ),
    tags(
        (name = "auth", description = "Registration, login, and token lifecycle"),
        (name = "users", description = "User profiles"),
        (name = "groups", description = "Expense groups and membership"),
        (name = "transactions", description = "Income and expense records"),
        (name = "analytics", description = "Monthly summaries")
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add the JWT Bearer security scheme to the OpenAPI spec.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}
