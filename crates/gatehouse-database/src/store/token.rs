//! Token store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use gatehouse_core::AppResult;
use gatehouse_core::config::OverflowStrategy;
use gatehouse_entity::token::{NewToken, RevokeReason, TokenRecord};

/// Result of storing a new session.
#[derive(Debug, Clone)]
pub struct IssueOutcome {
    /// The stored record.
    pub record: TokenRecord,
    /// Session ids deactivated to stay within the ceiling.
    pub evicted: Vec<Uuid>,
}

/// Result of exchanging a refresh credential.
#[derive(Debug, Clone)]
pub enum RotationOutcome {
    /// The presented record was retired and the successor stored.
    Rotated(TokenRecord),
    /// The presented record had already been rotated. Every active record of
    /// the family has been deactivated.
    Replayed { family_id: Uuid, revoked: u64 },
    /// The presented record cannot be refreshed.
    Rejected(&'static str),
}

/// Persisted session records.
///
/// A record is *live* when it is active and its refresh expiry is after
/// `now`; the per-user ceiling counts live records.
#[async_trait]
pub trait TokenStore: Send + Sync + 'static {
    /// Number of live records of a user.
    async fn count_active(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<u64>;

    /// Store a new session for `data.user_id`, keeping at most `ceiling` live
    /// records. When the ceiling is reached, `EvictOldest` deactivates the
    /// oldest live records first and `Reject` fails with `RateLimited`.
    ///
    /// Counting, evicting and inserting happen atomically with respect to
    /// other issuances for the same user.
    async fn issue(
        &self,
        data: &NewToken,
        ceiling: u32,
        strategy: OverflowStrategy,
        now: DateTime<Utc>,
    ) -> AppResult<IssueOutcome>;

    async fn find_by_session_id(&self, session_id: Uuid) -> AppResult<Option<TokenRecord>>;

    /// Deactivate one session. Returns `false` if it was not active.
    async fn deactivate(
        &self,
        session_id: Uuid,
        reason: RevokeReason,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Deactivate every active session of a user.
    async fn deactivate_all(
        &self,
        user_id: Uuid,
        reason: RevokeReason,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// Live records of a user, newest first, optionally excluding one session.
    async fn list_active(
        &self,
        user_id: Uuid,
        exclude: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<TokenRecord>>;

    /// Exchange the refresh credential of `session_id` for `successor`.
    ///
    /// Under the same per-user lock as `issue` and a lock on the presented
    /// record: rejects unknown sessions, hash
    /// mismatches, revoked or expired records; treats an already rotated
    /// record as replay; otherwise deactivates it, links it to the successor
    /// and inserts the successor in the same family and for the same user.
    async fn rotate(
        &self,
        session_id: Uuid,
        refresh_token_hash: &str,
        successor: &NewToken,
        now: DateTime<Utc>,
    ) -> AppResult<RotationOutcome>;

    /// Hard-delete records whose refresh expiry, or revocation, precedes `before`.
    async fn purge_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;
}
