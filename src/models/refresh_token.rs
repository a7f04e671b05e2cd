use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Refresh token entity backing the token-rotation scheme.
///
/// The raw signed token is never stored; `token_hash` holds its SHA-256
/// digest. `jti` links the row to the claim embedded in the signed token.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "refresh_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Unique token identifier embedded in the signed refresh token
    #[sea_orm(unique)]
    pub jti: String,

    /// SHA-256 hex digest of the full signed token
    pub token_hash: String,

    /// The user who owns this refresh token
    pub user_id: i32,

    /// Absolute UTC expiry; enforced by comparison, rows are not deleted
    pub expires_at: NaiveDateTime,

    /// Once true, never flips back
    #[sea_orm(default_value = false)]
    pub revoked: bool,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
