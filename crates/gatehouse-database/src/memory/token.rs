//! In-memory token store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use gatehouse_core::config::OverflowStrategy;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::token::{NewToken, RevokeReason, TokenRecord};

use crate::store::{IssueOutcome, RotationOutcome, TokenStore};

/// Token records kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    records: Mutex<Vec<TokenRecord>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn retire(record: &mut TokenRecord, reason: RevokeReason, now: DateTime<Utc>) {
    record.is_active = false;
    record.revoked_at = Some(now);
    record.revoked_reason = Some(reason.as_str().to_string());
}

fn deactivate_where(
    records: &mut [TokenRecord],
    reason: RevokeReason,
    now: DateTime<Utc>,
    matches: impl Fn(&TokenRecord) -> bool,
) -> u64 {
    let mut count = 0;
    for record in records.iter_mut().filter(|r| r.is_active && matches(r)) {
        retire(record, reason, now);
        count += 1;
    }
    count
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn count_active(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<u64> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|r| r.user_id == user_id && r.is_live(now))
            .count() as u64)
    }

    async fn issue(
        &self,
        data: &NewToken,
        ceiling: u32,
        strategy: OverflowStrategy,
        now: DateTime<Utc>,
    ) -> AppResult<IssueOutcome> {
        let mut records = self.records.lock().await;

        let mut live: Vec<&TokenRecord> = records
            .iter()
            .filter(|r| r.user_id == data.user_id && r.is_live(now))
            .collect();
        live.sort_by_key(|r| (r.created_at, r.id));

        let mut evicted = Vec::new();
        if ceiling > 0 && live.len() >= ceiling as usize {
            if strategy == OverflowStrategy::Reject {
                return Err(AppError::rate_limited(format!(
                    "Maximum of {ceiling} active sessions reached"
                )));
            }
            let excess = live.len() + 1 - ceiling as usize;
            evicted = live[..excess].iter().map(|r| r.session_id).collect();
        }

        for record in records
            .iter_mut()
            .filter(|r| evicted.contains(&r.session_id))
        {
            retire(record, RevokeReason::Evicted, now);
        }

        let record = TokenRecord::from_new(data, now);
        records.push(record.clone());

        if !evicted.is_empty() {
            info!(user_id = %data.user_id, evicted = evicted.len(), "Evicted oldest sessions");
        }

        Ok(IssueOutcome { record, evicted })
    }

    async fn find_by_session_id(&self, session_id: Uuid) -> AppResult<Option<TokenRecord>> {
        let records = self.records.lock().await;
        Ok(records.iter().find(|r| r.session_id == session_id).cloned())
    }

    async fn deactivate(
        &self,
        session_id: Uuid,
        reason: RevokeReason,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut records = self.records.lock().await;
        Ok(deactivate_where(&mut records, reason, now, |r| r.session_id == session_id) > 0)
    }

    async fn deactivate_all(
        &self,
        user_id: Uuid,
        reason: RevokeReason,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut records = self.records.lock().await;
        Ok(deactivate_where(&mut records, reason, now, |r| r.user_id == user_id))
    }

    async fn list_active(
        &self,
        user_id: Uuid,
        exclude: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<TokenRecord>> {
        let records = self.records.lock().await;
        let mut active: Vec<TokenRecord> = records
            .iter()
            .filter(|r| r.user_id == user_id && r.is_live(now) && Some(r.session_id) != exclude)
            .cloned()
            .collect();
        active.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(active)
    }

    async fn rotate(
        &self,
        session_id: Uuid,
        refresh_token_hash: &str,
        successor: &NewToken,
        now: DateTime<Utc>,
    ) -> AppResult<RotationOutcome> {
        let mut records = self.records.lock().await;

        let Some(index) = records.iter().position(|r| r.session_id == session_id) else {
            return Ok(RotationOutcome::Rejected("unknown session"));
        };
        let current = records[index].clone();

        if current.refresh_token_hash != refresh_token_hash {
            return Ok(RotationOutcome::Rejected("token mismatch"));
        }
        if current.is_rotated() {
            let revoked = deactivate_where(&mut records, RevokeReason::RefreshReuse, now, |r| {
                r.family_id == current.family_id
            });
            warn!(
                user_id = %current.user_id,
                family_id = %current.family_id,
                "Refresh token reuse detected, family revoked"
            );
            return Ok(RotationOutcome::Replayed {
                family_id: current.family_id,
                revoked,
            });
        }
        if !current.is_active {
            return Ok(RotationOutcome::Rejected("session revoked"));
        }
        if current.refresh_expires_at <= now {
            return Ok(RotationOutcome::Rejected("refresh token expired"));
        }

        let retired = &mut records[index];
        retire(retired, RevokeReason::Rotated, now);
        retired.replaced_by = Some(successor.session_id);

        let mut next = TokenRecord::from_new(successor, now);
        next.user_id = current.user_id;
        next.family_id = current.family_id;
        records.push(next.clone());

        Ok(RotationOutcome::Rotated(next))
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut records = self.records.lock().await;
        let len = records.len();
        records.retain(|r| {
            r.refresh_expires_at >= before && r.revoked_at.is_none_or(|at| at >= before)
        });
        Ok((len - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_token(user_id: Uuid, now: DateTime<Utc>) -> NewToken {
        NewToken {
            user_id,
            session_id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            access_token_hash: "access".to_string(),
            refresh_token_hash: "refresh".to_string(),
            access_expires_at: now + Duration::minutes(30),
            refresh_expires_at: now + Duration::days(30),
        }
    }

    #[tokio::test]
    async fn test_issue_evicts_oldest_at_ceiling() {
        let store = MemoryTokenStore::new();
        let user = Uuid::new_v4();
        let start = Utc::now();

        let mut sessions = Vec::new();
        for i in 0..4 {
            let now = start + Duration::seconds(i);
            let outcome = store
                .issue(&new_token(user, now), 3, OverflowStrategy::EvictOldest, now)
                .await
                .unwrap();
            sessions.push(outcome.record.session_id);
        }

        let now = start + Duration::seconds(10);
        assert_eq!(store.count_active(user, now).await.unwrap(), 3);

        let first = store.find_by_session_id(sessions[0]).await.unwrap().unwrap();
        assert!(!first.is_active);
        assert_eq!(first.revoked_reason.as_deref(), Some("evicted"));
    }

    #[tokio::test]
    async fn test_issue_rejects_at_ceiling() {
        let store = MemoryTokenStore::new();
        let user = Uuid::new_v4();
        let now = Utc::now();

        store
            .issue(&new_token(user, now), 1, OverflowStrategy::Reject, now)
            .await
            .unwrap();
        let err = store
            .issue(&new_token(user, now), 1, OverflowStrategy::Reject, now)
            .await
            .unwrap_err();

        assert_eq!(err.kind, gatehouse_core::ErrorKind::RateLimited);
        assert_eq!(store.count_active(user, now).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rotate_twice_revokes_family() {
        let store = MemoryTokenStore::new();
        let user = Uuid::new_v4();
        let now = Utc::now();

        let first = store
            .issue(&new_token(user, now), 5, OverflowStrategy::EvictOldest, now)
            .await
            .unwrap()
            .record;

        let successor = new_token(user, now);
        let rotated = store
            .rotate(first.session_id, "refresh", &successor, now)
            .await
            .unwrap();
        let RotationOutcome::Rotated(second) = rotated else {
            panic!("expected rotation");
        };
        assert_eq!(second.family_id, first.family_id);

        let replay = store
            .rotate(first.session_id, "refresh", &new_token(user, now), now)
            .await
            .unwrap();
        assert!(matches!(replay, RotationOutcome::Replayed { revoked: 1, .. }));

        let second = store.find_by_session_id(second.session_id).await.unwrap().unwrap();
        assert!(!second.is_active);
        assert_eq!(second.revoked_reason.as_deref(), Some("refresh_reuse"));
    }

    #[tokio::test]
    async fn test_purge_removes_expired_and_old_revoked() {
        let store = MemoryTokenStore::new();
        let user = Uuid::new_v4();
        let now = Utc::now();

        let kept = store
            .issue(&new_token(user, now), 0, OverflowStrategy::EvictOldest, now)
            .await
            .unwrap()
            .record;
        let revoked = store
            .issue(&new_token(user, now), 0, OverflowStrategy::EvictOldest, now)
            .await
            .unwrap()
            .record;
        store
            .deactivate(revoked.session_id, RevokeReason::Logout, now)
            .await
            .unwrap();

        let purged = store.purge_expired(now + Duration::seconds(1)).await.unwrap();
        assert_eq!(purged, 1);
        assert!(store.find_by_session_id(kept.session_id).await.unwrap().is_some());
    }
}
