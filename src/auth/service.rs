//! Authentication service: the only component that combines the token codec
//! and the refresh-token repository into business-level operations.
//!
//! Refresh-token lifecycle: `ISSUED → (REDEEMED, EXPIRED, or REVOKED)`.
//! Redemption revokes the presented token before the replacement pair is
//! returned, so a given jti is redeemable exactly once.

use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    TransactionTrait,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::auth::jwt::{TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH, TokenCodec, hash_token};
use crate::auth::password::verify_password;
use crate::auth::refresh;
use crate::error::AppError;
use crate::models::user;

/// Internal authentication failure causes. Externally every non-fault
/// variant collapses to a uniform 401 via [`AuthError::into_response_error`];
/// the distinctions exist for diagnostic logging only.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken,

    #[error("wrong token type")]
    WrongTokenType,

    #[error("missing required claims")]
    MissingClaims,

    #[error("unknown token id")]
    UnknownJti,

    #[error("token already revoked")]
    Revoked,

    #[error("token record expired")]
    RecordExpired,

    #[error("token hash mismatch")]
    HashMismatch,

    #[error("user absent, inactive, or renamed")]
    UserUnavailable,

    #[error("user is inactive")]
    InactiveUser,

    /// Genuine server faults (storage, signing) pass through untouched.
    #[error(transparent)]
    Fault(#[from] AppError),
}

impl From<DbErr> for AuthError {
    fn from(err: DbErr) -> Self {
        AuthError::Fault(AppError::Database(err))
    }
}

impl AuthError {
    /// Collapse to the client-facing error. Expected authentication failures
    /// all become a 401 with the given uniform message — which validation
    /// step failed is logged, never surfaced. Faults keep their own status.
    pub fn into_response_error(self, public_message: &str) -> AppError {
        match self {
            AuthError::Fault(inner) => inner,
            cause => {
                tracing::debug!(%cause, "authentication failure");
                AppError::Unauthorized(public_message.to_string())
            }
        }
    }
}

/// A freshly issued access + refresh token pair.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Stateless orchestrator over the codec and the refresh-token repository.
/// Constructed once at startup and shared via application state.
#[derive(Debug, Clone)]
pub struct AuthService {
    codec: TokenCodec,
}

impl AuthService {
    pub fn new(codec: TokenCodec) -> Self {
        AuthService { codec }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Authenticate by username or email (same input field) and password.
    ///
    /// Returns `Ok(None)` — not an error — for unknown identifier, inactive
    /// user, missing stored hash, or a failed password check, so the caller
    /// cannot distinguish which check failed.
    pub async fn authenticate_user(
        &self,
        db: &DatabaseConnection,
        identifier: &str,
        password: &str,
    ) -> Result<Option<user::Model>, AppError> {
        let mut found = user::Entity::find()
            .filter(user::Column::Username.eq(identifier))
            .one(db)
            .await?;

        if found.is_none() {
            found = user::Entity::find()
                .filter(user::Column::Email.eq(identifier))
                .one(db)
                .await?;
        }

        let Some(user) = found else {
            return Ok(None);
        };

        if !user.is_active || user.password_hash.is_empty() {
            return Ok(None);
        }

        if !verify_password(password, &user.password_hash)? {
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Issue a fresh access + refresh pair for an active user and persist
    /// the refresh-token row (hash only). The only path that creates token
    /// state from a clean slate (login, registration).
    ///
    /// Generic over the connection so the refresh path can reissue inside
    /// its transaction.
    pub async fn generate_tokens<C: ConnectionTrait>(
        &self,
        conn: &C,
        user: &user::Model,
    ) -> Result<TokenPair, AuthError> {
        if !user.is_active {
            return Err(AuthError::InactiveUser);
        }

        let access_token = self.codec.issue_access_token(&user.username)?;
        let (refresh_token, jti) = self.codec.issue_refresh_token(&user.username, None)?;

        let expires_at = (Utc::now() + self.codec.refresh_ttl()).naive_utc();
        refresh::create(conn, &jti, &hash_token(&refresh_token), user.id, expires_at).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Redeem a refresh token for a new pair, revoking the presented token.
    ///
    /// Validation order: signature/expiry, claim type, required claims, row
    /// lookup by jti, revoked flag, row expiry, at-rest hash comparison,
    /// user resolution (present, active, username still matches). The
    /// revoke and the reissue run in one transaction, revoke first; the
    /// revoke itself is a conditional update, so of two concurrent
    /// redemptions of the same token at most one succeeds.
    pub async fn refresh_access_token(
        &self,
        db: &DatabaseConnection,
        raw_token: &str,
    ) -> Result<TokenPair, AuthError> {
        let claims = self.codec.decode(raw_token).ok_or(AuthError::InvalidToken)?;

        if claims.token_type != TOKEN_TYPE_REFRESH {
            return Err(AuthError::WrongTokenType);
        }

        if claims.sub.is_empty() {
            return Err(AuthError::MissingClaims);
        }
        let jti = claims
            .jti
            .as_deref()
            .filter(|j| !j.is_empty())
            .ok_or(AuthError::MissingClaims)?;

        // Dropping the transaction without commit rolls it back, so every
        // early return below leaves the row untouched.
        let txn = db.begin().await?;

        let record = refresh::find_by_jti(&txn, jti)
            .await?
            .ok_or(AuthError::UnknownJti)?;

        if record.revoked {
            return Err(AuthError::Revoked);
        }

        // Defense in depth beyond the signature's own exp claim.
        if record.expires_at <= Utc::now().naive_utc() {
            return Err(AuthError::RecordExpired);
        }

        if record.token_hash != hash_token(raw_token) {
            return Err(AuthError::HashMismatch);
        }

        let user = user::Entity::find_by_id(record.user_id)
            .one(&txn)
            .await?
            .ok_or(AuthError::UserUnavailable)?;

        if !user.is_active || user.username != claims.sub {
            return Err(AuthError::UserUnavailable);
        }

        // Atomic check-and-set: a concurrent redemption of the same jti
        // loses here with zero rows affected.
        if refresh::revoke(&txn, jti).await? == 0 {
            return Err(AuthError::Revoked);
        }

        let pair = self.generate_tokens(&txn, &user).await?;
        txn.commit().await.map_err(AuthError::from)?;

        Ok(pair)
    }

    /// Resolve the current user from a bearer access token. Side-effect
    /// free; invoked on every authenticated request.
    pub async fn get_user_from_token(
        &self,
        db: &DatabaseConnection,
        raw_token: &str,
    ) -> Result<user::Model, AuthError> {
        let claims = self.codec.decode(raw_token).ok_or(AuthError::InvalidToken)?;

        if claims.token_type != TOKEN_TYPE_ACCESS {
            return Err(AuthError::WrongTokenType);
        }

        if claims.sub.is_empty() {
            return Err(AuthError::MissingClaims);
        }

        let user = user::Entity::find()
            .filter(user::Column::Username.eq(&claims.sub))
            .one(db)
            .await?
            .ok_or(AuthError::UserUnavailable)?;

        if !user.is_active {
            return Err(AuthError::UserUnavailable);
        }

        Ok(user)
    }
}
