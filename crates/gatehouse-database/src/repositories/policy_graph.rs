//! Permission resolution query.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use gatehouse_core::result::AppResult;

use super::db_error;
use crate::store::PolicyGraph;

/// Every hop of the chain must be live.
const PERMISSION_CODES_FOR_USER: &str = "\
    SELECT DISTINCT p.code \
    FROM user_roles ur \
    JOIN roles r ON r.id = ur.role_id AND r.deleted_at IS NULL \
    JOIN role_permissions rp ON rp.role_id = r.id AND rp.deleted_at IS NULL \
    JOIN permissions p ON p.id = rp.permission_id AND p.deleted_at IS NULL \
    WHERE ur.user_id = $1 AND ur.deleted_at IS NULL";

/// Reads the policy graph with a single four-table join.
#[derive(Debug, Clone)]
pub struct PolicyGraphRepository {
    pool: PgPool,
}

impl PolicyGraphRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyGraph for PolicyGraphRepository {
    async fn permission_codes_for_user(&self, user_id: Uuid) -> AppResult<HashSet<String>> {
        let codes: Vec<String> = sqlx::query_scalar(PERMISSION_CODES_FOR_USER)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to resolve permissions"))?;
        Ok(codes.into_iter().collect())
    }
}
