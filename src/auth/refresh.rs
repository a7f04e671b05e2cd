//! Refresh token repository: durable storage and lookup of refresh-token
//! rows. No other module writes to the `refresh_tokens` table.
//!
//! All functions are generic over [`ConnectionTrait`] so the auth service
//! can run redemption inside a single transaction.

use chrono::{NaiveDateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};

use crate::models::refresh_token;

/// Insert a new refresh-token row.
///
/// Fails only on constraint violation; a duplicate jti means either a bug or
/// an astronomically unlikely random collision, so the `DbErr` is left to
/// propagate as a server fault.
pub async fn create<C: ConnectionTrait>(
    conn: &C,
    jti: &str,
    token_hash: &str,
    user_id: i32,
    expires_at: NaiveDateTime,
) -> Result<refresh_token::Model, DbErr> {
    let now = Utc::now().naive_utc();

    let model = refresh_token::ActiveModel {
        jti: Set(jti.to_string()),
        token_hash: Set(token_hash.to_string()),
        user_id: Set(user_id),
        expires_at: Set(expires_at),
        revoked: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    model.insert(conn).await
}

/// Point lookup by the unique jti index. Absence is `None`, not an error.
pub async fn find_by_jti<C: ConnectionTrait>(
    conn: &C,
    jti: &str,
) -> Result<Option<refresh_token::Model>, DbErr> {
    refresh_token::Entity::find()
        .filter(refresh_token::Column::Jti.eq(jti))
        .one(conn)
        .await
}

/// Conditionally revoke a token: `revoked = true` only where it is still
/// false. Returns the number of affected rows, so concurrent redemptions
/// serialize on this check-and-set — exactly one caller observes `1`.
///
/// Idempotent: revoking an already-revoked row succeeds and affects 0 rows.
pub async fn revoke<C: ConnectionTrait>(conn: &C, jti: &str) -> Result<u64, DbErr> {
    let res = refresh_token::Entity::update_many()
        .col_expr(refresh_token::Column::Revoked, Expr::value(true))
        .col_expr(
            refresh_token::Column::UpdatedAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(refresh_token::Column::Jti.eq(jti))
        .filter(refresh_token::Column::Revoked.eq(false))
        .exec(conn)
        .await?;

    Ok(res.rows_affected)
}

/// Revoke every live refresh token a user holds (logout everywhere,
/// password change).
pub async fn revoke_all_for_user<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<(), DbErr> {
    refresh_token::Entity::update_many()
        .col_expr(refresh_token::Column::Revoked, Expr::value(true))
        .col_expr(
            refresh_token::Column::UpdatedAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(refresh_token::Column::UserId.eq(user_id))
        .filter(refresh_token::Column::Revoked.eq(false))
        .exec(conn)
        .await?;

    Ok(())
}
