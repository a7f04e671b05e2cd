use axum::{extract::FromRequestParts, http::request::Parts};

use crate::controllers::AppState;
use crate::error::AppError;
use crate::models::user;

/// Extractor that validates the bearer access token and resolves the
/// authenticated user. Rejects with a uniform 401 before any handler logic
/// runs.
///
/// Usage in handlers:
/// ```rust,ignore
/// async fn my_handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     // user is the full user model
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

        let user = state
            .auth
            .get_user_from_token(&state.db, token)
            .await
            .map_err(|e| e.into_response_error("Not authenticated"))?;

        Ok(CurrentUser(user))
    }
}
