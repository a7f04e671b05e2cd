use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Page-based pagination query parameters.
///
/// Usage in handlers:
/// ```rust,ignore
/// async fn list(pagination: Pagination) -> impl IntoResponse {
///     // pagination.page, pagination.page_size
/// }
/// ```
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// 1-based page number (default: 1)
    #[serde(default = "default_page")]
    pub page: u64,

    /// Items per page (default: 20, max: 100)
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    20
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: 1,
            page_size: 20,
        }
    }
}

impl Pagination {
    /// Clamp page to ≥ 1 and page_size to 1..=100.
    pub fn clamped(&self) -> Self {
        Pagination {
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, 100),
        }
    }

    /// Rows to skip for this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size
    }
}

impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = crate::error::AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or("");
        let pagination: Pagination = serde_urlencoded::from_str(query).unwrap_or_default();
        Ok(pagination.clamped())
    }
}
