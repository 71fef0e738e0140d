//! Token lifecycle manager: issue, validate, refresh, revoke.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use gatehouse_core::config::TokenConfig;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::store::{CredentialStore, RotationOutcome, TokenStore};
use gatehouse_entity::token::{NewToken, RevokeReason, TokenKind, TokenRecord, TokenSummary};
use gatehouse_entity::user::User;

use super::codec::{TokenCodec, hash_token};

/// Credentials returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived access credential.
    pub access_token: String,
    /// Long-lived, single-use refresh credential.
    pub refresh_token: String,
    /// Always `"bearer"`.
    pub token_type: String,
    /// Session the pair belongs to.
    pub session_id: Uuid,
    /// Access credential expiry.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh credential expiry.
    pub refresh_expires_at: DateTime<Utc>,
}

/// A validated access credential.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// The owning user.
    pub user: User,
    /// The session record behind the credential.
    pub session: TokenRecord,
}

/// `now` plus a configured TTL, or a configuration error when the TTL does
/// not fit the timestamp range.
fn expiry(
    now: DateTime<Utc>,
    ttl: u64,
    unit: fn(i64) -> Option<Duration>,
    key: &str,
) -> AppResult<DateTime<Utc>> {
    i64::try_from(ttl)
        .ok()
        .and_then(unit)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AppError::configuration(format!("{key} = {ttl} is out of range")))
}

/// Manages the complete token lifecycle on top of a [`TokenStore`].
#[derive(Clone)]
pub struct TokenManager {
    codec: Arc<dyn TokenCodec>,
    tokens: Arc<dyn TokenStore>,
    users: Arc<dyn CredentialStore>,
    config: TokenConfig,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("scheme", &self.codec.scheme())
            .field("config", &self.config)
            .finish()
    }
}

impl TokenManager {
    /// Creates a new token manager.
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        tokens: Arc<dyn TokenStore>,
        users: Arc<dyn CredentialStore>,
        config: TokenConfig,
    ) -> Self {
        Self {
            codec,
            tokens,
            users,
            config,
        }
    }

    /// Token configuration in effect.
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Mints a fresh pair for a new session and returns it with the record data.
    fn mint_pair(
        &self,
        user_id: Uuid,
        family_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<(TokenPair, NewToken)> {
        let session_id = Uuid::new_v4();
        let access_expires_at = expiry(
            now,
            self.config.access_ttl_minutes,
            Duration::try_minutes,
            "token.access_ttl_minutes",
        )?;
        let refresh_expires_at = expiry(
            now,
            self.config.refresh_ttl_hours,
            Duration::try_hours,
            "token.refresh_ttl_hours",
        )?;

        let access_token = self
            .codec
            .mint(session_id, TokenKind::Access, now, access_expires_at)?;
        let refresh_token = self
            .codec
            .mint(session_id, TokenKind::Refresh, now, refresh_expires_at)?;

        let data = NewToken {
            user_id,
            session_id,
            family_id,
            access_token_hash: hash_token(&access_token),
            refresh_token_hash: hash_token(&refresh_token),
            access_expires_at,
            refresh_expires_at,
        };
        let pair = TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            session_id,
            access_expires_at,
            refresh_expires_at,
        };
        Ok((pair, data))
    }

    /// Issues a new session for an already authenticated user.
    ///
    /// When the user is at the active-session ceiling the configured
    /// overflow strategy either evicts the oldest sessions or fails with
    /// `RateLimited`.
    pub async fn issue(&self, user: &User) -> AppResult<TokenPair> {
        let now = Utc::now();
        let (pair, data) = self.mint_pair(user.id, Uuid::new_v4(), now)?;

        let outcome = self
            .tokens
            .issue(
                &data,
                self.config.max_active_per_user,
                self.config.overflow_strategy,
                now,
            )
            .await?;

        info!(
            user_id = %user.id,
            session_id = %outcome.record.session_id,
            evicted = outcome.evicted.len(),
            "Session issued"
        );
        Ok(pair)
    }

    /// Validates an access credential and resolves its session and owner.
    pub async fn authenticate(&self, raw: &str) -> AppResult<Authenticated> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AppError::unauthorized("Missing token"));
        }

        let session_id = self.codec.session_of(raw, TokenKind::Access)?;
        let session = self
            .tokens
            .find_by_session_id(session_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid token"))?;

        if session.access_token_hash != hash_token(raw) {
            return Err(AppError::unauthorized("Invalid token"));
        }
        if !session.access_valid(Utc::now()) {
            return Err(AppError::unauthorized(if session.is_active {
                "Token has expired"
            } else {
                "Token has been revoked"
            }));
        }

        let user = self
            .users
            .find_by_id(session.user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;

        Ok(Authenticated { user, session })
    }

    /// Validates an access credential and returns its owner.
    pub async fn validate(&self, raw: &str) -> AppResult<User> {
        Ok(self.authenticate(raw).await?.user)
    }

    /// Exchanges a refresh credential for a new pair.
    ///
    /// The presented credential is retired. Presenting a retired credential
    /// again revokes every session descending from the same login.
    pub async fn refresh(&self, raw_refresh: &str) -> AppResult<TokenPair> {
        let raw = raw_refresh.trim();
        if raw.is_empty() {
            return Err(AppError::unauthorized("Missing refresh token"));
        }

        let session_id = self.codec.session_of(raw, TokenKind::Refresh)?;
        let current = self
            .tokens
            .find_by_session_id(session_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid refresh token"))?;

        let now = Utc::now();
        let (pair, successor) = self.mint_pair(current.user_id, current.family_id, now)?;

        match self
            .tokens
            .rotate(session_id, &hash_token(raw), &successor, now)
            .await?
        {
            RotationOutcome::Rotated(record) => {
                info!(
                    user_id = %record.user_id,
                    session_id = %record.session_id,
                    previous = %session_id,
                    "Session refreshed"
                );
                Ok(pair)
            }
            RotationOutcome::Replayed { family_id, revoked } => {
                warn!(
                    user_id = %current.user_id,
                    family_id = %family_id,
                    revoked,
                    "Rejected reused refresh token"
                );
                Err(AppError::unauthorized("Refresh token has already been used"))
            }
            RotationOutcome::Rejected(reason) => {
                Err(AppError::unauthorized(format!("Invalid refresh token: {reason}")))
            }
        }
    }

    /// Deactivates the session of an access credential.
    ///
    /// Expired credentials are accepted. Revoking an already inactive
    /// session succeeds; an unknown session is `Unauthorized`.
    pub async fn revoke(&self, raw: &str) -> AppResult<()> {
        let raw = raw.trim();
        let session_id = self
            .codec
            .session_of_ignoring_expiry(raw, TokenKind::Access)?;
        let session = self
            .tokens
            .find_by_session_id(session_id)
            .await?
            .filter(|s| s.access_token_hash == hash_token(raw))
            .ok_or_else(|| AppError::unauthorized("Invalid token"))?;

        if !session.is_active {
            return Ok(());
        }

        self.tokens
            .deactivate(session_id, RevokeReason::Logout, Utc::now())
            .await?;
        info!(user_id = %session.user_id, session_id = %session_id, "Session revoked");
        Ok(())
    }

    /// Deactivates every session of the credential's owner, including its own.
    pub async fn revoke_all(&self, raw: &str) -> AppResult<u64> {
        let auth = self.authenticate(raw).await?;
        self.revoke_user(auth.user.id, RevokeReason::LogoutAll).await
    }

    /// Deactivates every session of a user.
    pub async fn revoke_user(&self, user_id: Uuid, reason: RevokeReason) -> AppResult<u64> {
        let count = self
            .tokens
            .deactivate_all(user_id, reason, Utc::now())
            .await?;
        info!(user_id = %user_id, count, reason = %reason, "All sessions revoked");
        Ok(count)
    }

    /// Other live sessions of the credential's owner.
    pub async fn list_active(&self, raw: &str) -> AppResult<Vec<TokenSummary>> {
        let auth = self.authenticate(raw).await?;
        let records = self
            .tokens
            .list_active(auth.user.id, Some(auth.session.session_id), Utc::now())
            .await?;
        Ok(records.iter().map(TokenSummary::from).collect())
    }

    /// Live sessions of a user.
    pub async fn sessions_of(&self, user_id: Uuid) -> AppResult<Vec<TokenSummary>> {
        let records = self.tokens.list_active(user_id, None, Utc::now()).await?;
        Ok(records.iter().map(TokenSummary::from).collect())
    }

    /// Removes records that expired, or were revoked, before `before`.
    pub async fn purge_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let purged = self.tokens.purge_expired(before).await?;
        info!(purged, before = %before, "Purged stale token records");
        Ok(purged)
    }
}
