//! PostgreSQL implementations of the store contracts.

pub mod audit;
pub mod catalog;
pub mod link;
pub mod policy_graph;
pub mod token;
pub mod user;

pub use audit::ChangeLogRepository;
pub use catalog::CatalogRepository;
pub use link::LinkRepository;
pub use policy_graph::PolicyGraphRepository;
pub use token::TokenRepository;
pub use user::UserRepository;

use gatehouse_core::error::{AppError, ErrorKind};

/// Name of the violated unique constraint, if `err` is a unique violation.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

/// Whether `err` is a foreign key violation.
pub(crate) fn foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

/// Wrap a driver error with context.
pub(crate) fn db_error(message: impl Into<String>) -> impl FnOnce(sqlx::Error) -> AppError {
    let message = message.into();
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}
