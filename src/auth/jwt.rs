use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;

/// Claim type carried by short-lived bearer tokens.
pub const TOKEN_TYPE_ACCESS: &str = "access";
/// Claim type carried by long-lived rotating tokens.
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// JWT claims payload. The schema is closed: anything else in a presented
/// token is ignored, and missing fields fail decoding.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Token kind: "access" or "refresh"
    #[serde(rename = "type")]
    pub token_type: String,
    /// Refresh-token identifier linking the token to its persisted row
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Issues and verifies both token kinds with a symmetric HS256 key.
/// Pure codec: no side effects, no storage access.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: impl Into<String>, access_minutes: u64, refresh_days: u64) -> Self {
        // No expiry leeway: a token expired one second ago is expired.
        let mut validation = Validation::default();
        validation.leeway = 0;

        TokenCodec {
            secret: secret.into(),
            access_ttl: Duration::minutes(access_minutes as i64),
            refresh_ttl: Duration::days(refresh_days as i64),
            validation,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        TokenCodec::new(
            config.jwt_secret.clone(),
            config.access_token_expiry_minutes,
            config.refresh_token_expiry_days,
        )
    }

    /// TTL applied to refresh tokens; also used for the persisted row expiry.
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Create a signed access token for the given username.
    pub fn issue_access_token(&self, username: &str) -> Result<String, AppError> {
        self.issue(username, TOKEN_TYPE_ACCESS, self.access_ttl, None)
    }

    /// Create a signed refresh token for the given username.
    ///
    /// Returns `(token, jti)`. A fresh random jti is generated unless one is
    /// supplied. Persisting the matching row is the caller's job.
    pub fn issue_refresh_token(
        &self,
        username: &str,
        jti: Option<String>,
    ) -> Result<(String, String), AppError> {
        let jti = jti.unwrap_or_else(|| Uuid::new_v4().to_string());
        let token = self.issue(username, TOKEN_TYPE_REFRESH, self.refresh_ttl, Some(jti.clone()))?;
        Ok((token, jti))
    }

    fn issue(
        &self,
        username: &str,
        token_type: &str,
        ttl: Duration,
        jti: Option<String>,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let expires = now + ttl;

        let claims = Claims {
            sub: username.to_string(),
            exp: expires.timestamp() as usize,
            iat: now.timestamp() as usize,
            token_type: token_type.to_string(),
            jti,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify signature and expiry, returning the claims on success.
    ///
    /// Malformed, tampered, or expired input is an expected outcome and
    /// yields `None`, never an error.
    pub fn decode(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &self.validation,
        )
        .map(|data| data.claims)
        .ok()
    }
}

/// SHA-256 hex digest of a raw token, for at-rest storage and comparison.
/// The raw refresh token is never written to the database.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new("unit-test-secret", 30, 7)
    }

    #[test]
    fn access_token_round_trips() {
        let c = codec();
        let token = c.issue_access_token("alice").unwrap();
        let claims = c.decode(&token).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.token_type, TOKEN_TYPE_ACCESS);
        assert!(claims.jti.is_none());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_token_carries_a_fresh_jti() {
        let c = codec();
        let (t1, jti1) = c.issue_refresh_token("alice", None).unwrap();
        let (t2, jti2) = c.issue_refresh_token("alice", None).unwrap();

        assert_ne!(jti1, jti2);
        assert_eq!(c.decode(&t1).unwrap().jti.as_deref(), Some(jti1.as_str()));
        assert_eq!(c.decode(&t2).unwrap().token_type, TOKEN_TYPE_REFRESH);
    }

    #[test]
    fn decode_rejects_the_wrong_secret() {
        let token = codec().issue_access_token("alice").unwrap();
        let other = TokenCodec::new("another-secret", 30, 7);
        assert!(other.decode(&token).is_none());
    }

    #[test]
    fn decode_rejects_tampered_and_malformed_input() {
        let c = codec();
        let mut token = c.issue_access_token("alice").unwrap();
        token.push('x');

        assert!(c.decode(&token).is_none());
        assert!(c.decode("").is_none());
        assert!(c.decode("not.a.jwt").is_none());
    }

    fn token_expiring_at(exp: chrono::DateTime<Utc>) -> String {
        let claims = Claims {
            sub: "alice".to_string(),
            exp: exp.timestamp() as usize,
            iat: (exp - Duration::minutes(5)).timestamp() as usize,
            token_type: TOKEN_TYPE_ACCESS.to_string(),
            jti: None,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("unit-test-secret".as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn decode_rejects_expired_tokens() {
        let c = codec();
        let token = token_expiring_at(Utc::now() - Duration::hours(2));
        assert!(c.decode(&token).is_none());
    }

    #[test]
    fn expiry_has_no_grace_window() {
        let c = codec();

        // One second past expiry is already too late.
        let barely = token_expiring_at(Utc::now() - Duration::seconds(1));
        assert!(c.decode(&barely).is_none());

        // Inside jsonwebtoken's default 60s leeway, which must be disabled.
        let within_leeway = token_expiring_at(Utc::now() - Duration::seconds(30));
        assert!(c.decode(&within_leeway).is_none());

        // Not yet expired still decodes.
        let live = token_expiring_at(Utc::now() + Duration::seconds(30));
        assert!(c.decode(&live).is_some());
    }

    #[test]
    fn hash_token_is_deterministic_and_hex() {
        let h1 = hash_token("some-token");
        let h2 = hash_token("some-token");
        let h3 = hash_token("other-token");

        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert_eq!(h1.len(), 64);
        assert!(h1.chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
