//! Request context carrying the acting principal.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use gatehouse_auth::{Authenticated, AuthorizationResolver};
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::SYSTEM_ACTOR;
use gatehouse_entity::user::User;

/// Who is performing an operation.
#[derive(Debug, Clone)]
pub enum Actor {
    /// A user authenticated through an access credential.
    User(User),
    /// The operator or the process itself (CLI, seeding). Never checked.
    System,
}

/// Context for the current request.
///
/// Built from a validated access credential and passed into every guarded
/// service method so that each operation knows who is acting.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The acting principal.
    pub actor: Actor,
    /// Session of the presented credential, if any.
    pub session_id: Option<Uuid>,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Context for an authenticated user.
    pub fn for_user(user: User, session_id: Option<Uuid>) -> Self {
        Self {
            actor: Actor::User(user),
            session_id,
            request_time: Utc::now(),
        }
    }

    /// Context for operator and bootstrap tasks.
    pub fn system() -> Self {
        Self {
            actor: Actor::System,
            session_id: None,
            request_time: Utc::now(),
        }
    }

    /// Identifier recorded in audit columns.
    pub fn actor_id(&self) -> Uuid {
        match &self.actor {
            Actor::User(user) => user.id,
            Actor::System => SYSTEM_ACTOR,
        }
    }

    /// The acting user, unless this is a system context.
    pub fn user(&self) -> Option<&User> {
        match &self.actor {
            Actor::User(user) => Some(user),
            Actor::System => None,
        }
    }

    /// The acting user, or `Unauthorized` for a system context.
    pub fn require_user(&self) -> AppResult<&User> {
        self.user()
            .ok_or_else(|| AppError::unauthorized("Operation requires an authenticated user"))
    }

    /// Fails with `Forbidden` unless the actor holds `code`.
    pub async fn authorize(&self, resolver: &AuthorizationResolver, code: &str) -> AppResult<()> {
        match &self.actor {
            Actor::User(user) => resolver.has_permission(code, user).await,
            Actor::System => Ok(()),
        }
    }
}

impl From<Authenticated> for RequestContext {
    fn from(auth: Authenticated) -> Self {
        Self::for_user(auth.user, Some(auth.session.session_id))
    }
}
