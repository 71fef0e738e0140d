//! JWT claims structure used in access and refresh tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gatehouse_entity::token::TokenKind;

/// JWT claims payload.
///
/// Only the session identifier is embedded; the owning user is resolved
/// server-side from the token record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Session ID this token belongs to.
    pub sid: Uuid,
    /// Token type: `"access"` or `"refresh"`.
    pub typ: TokenKind,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Unique token ID.
    pub jti: Uuid,
}

impl Claims {
    /// Claims for one credential of a session.
    pub fn new(
        session_id: Uuid,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sid: session_id,
            typ: kind,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        }
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}
