//! Token record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One authenticated session: the server-side state behind an access/refresh pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TokenRecord {
    /// Row identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Random session identifier embedded in the issued credentials.
    pub session_id: Uuid,
    /// Lineage shared by every rotation that descends from one login.
    pub family_id: Uuid,
    /// SHA-256 hex digest of the access credential.
    #[serde(skip_serializing)]
    pub access_token_hash: String,
    /// SHA-256 hex digest of the refresh credential.
    #[serde(skip_serializing)]
    pub refresh_token_hash: String,
    /// Whether the session may still be used.
    pub is_active: bool,
    /// When the session was issued.
    pub created_at: DateTime<Utc>,
    /// Access credential expiry.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh credential expiry.
    pub refresh_expires_at: DateTime<Utc>,
    /// When the session was deactivated.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Why the session was deactivated.
    pub revoked_reason: Option<String>,
    /// Session id of the record that replaced this one on refresh.
    pub replaced_by: Option<Uuid>,
}

impl TokenRecord {
    /// Active and the refresh credential has not expired.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.refresh_expires_at > now
    }

    /// Whether the access credential is usable at `now`.
    pub fn access_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.access_expires_at > now
    }

    /// Whether the record was retired by a successful refresh.
    pub fn is_rotated(&self) -> bool {
        self.replaced_by.is_some()
    }

    /// Build the stored row for a new session.
    pub fn from_new(data: &NewToken, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            session_id: data.session_id,
            family_id: data.family_id,
            access_token_hash: data.access_token_hash.clone(),
            refresh_token_hash: data.refresh_token_hash.clone(),
            is_active: true,
            created_at: now,
            access_expires_at: data.access_expires_at,
            refresh_expires_at: data.refresh_expires_at,
            revoked_at: None,
            revoked_reason: None,
            replaced_by: None,
        }
    }
}

/// Data required to store a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewToken {
    /// Owning user.
    pub user_id: Uuid,
    /// Freshly generated session identifier.
    pub session_id: Uuid,
    /// Family the session belongs to.
    pub family_id: Uuid,
    /// SHA-256 hex digest of the access credential.
    pub access_token_hash: String,
    /// SHA-256 hex digest of the refresh credential.
    pub refresh_token_hash: String,
    /// Access credential expiry.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh credential expiry.
    pub refresh_expires_at: DateTime<Utc>,
}

/// Which of the two credentials of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived credential presented on every request.
    Access,
    /// Long-lived credential exchanged for a new pair.
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Reason recorded when a session is deactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevokeReason {
    /// The owner logged out of this session.
    Logout,
    /// The owner logged out of every session.
    LogoutAll,
    /// The per-user ceiling pushed the session out.
    Evicted,
    /// The refresh credential was exchanged for a new pair.
    Rotated,
    /// A retired refresh credential was presented again.
    RefreshReuse,
    /// An administrator revoked the session.
    Admin,
}

impl RevokeReason {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            RevokeReason::Logout => "logout",
            RevokeReason::LogoutAll => "logout_all",
            RevokeReason::Evicted => "evicted",
            RevokeReason::Rotated => "rotated",
            RevokeReason::RefreshReuse => "refresh_reuse",
            RevokeReason::Admin => "admin",
        }
    }
}

impl std::fmt::Display for RevokeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public view of an active session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSummary {
    /// Session identifier.
    pub session_id: Uuid,
    /// When the session was issued.
    pub created_at: DateTime<Utc>,
    /// Access credential expiry.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh credential expiry.
    pub refresh_expires_at: DateTime<Utc>,
}

impl From<&TokenRecord> for TokenSummary {
    fn from(record: &TokenRecord) -> Self {
        Self {
            session_id: record.session_id,
            created_at: record.created_at,
            access_expires_at: record.access_expires_at,
            refresh_expires_at: record.refresh_expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_access_expires_before_session() {
        let now = Utc::now();
        let record = TokenRecord::from_new(
            &NewToken {
                user_id: Uuid::new_v4(),
                session_id: Uuid::new_v4(),
                family_id: Uuid::new_v4(),
                access_token_hash: "a".repeat(64),
                refresh_token_hash: "b".repeat(64),
                access_expires_at: now + Duration::minutes(30),
                refresh_expires_at: now + Duration::hours(24),
            },
            now,
        );
        assert!(record.access_valid(now));

        let later = now + Duration::hours(1);
        assert!(!record.access_valid(later));
        assert!(record.is_live(later));

        let revoked = TokenRecord {
            is_active: false,
            ..record
        };
        assert!(!revoked.access_valid(now));
    }
}
