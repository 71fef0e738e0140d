//! Account operations: registration, login, sessions and password changes.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use gatehouse_auth::{PasswordHasher, TokenManager, TokenPair};
use gatehouse_core::config::AuthConfig;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::store::CredentialStore;
use gatehouse_entity::token::TokenSummary;
use gatehouse_entity::user::{NewUser, User, age_on};

use crate::context::RequestContext;

/// Self-registration form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub birthdate: NaiveDate,
}

/// Login form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Password change form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Handles the account lifecycle of end users.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn CredentialStore>,
    hasher: Arc<PasswordHasher>,
    tokens: Arc<TokenManager>,
    min_age_years: u32,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("tokens", &self.tokens)
            .field("min_age_years", &self.min_age_years)
            .finish_non_exhaustive()
    }
}

impl AccountService {
    /// Creates a new account service.
    pub fn new(
        users: Arc<dyn CredentialStore>,
        hasher: Arc<PasswordHasher>,
        tokens: Arc<TokenManager>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            min_age_years: config.min_age_years,
        }
    }

    /// Registers a new user.
    pub async fn register(&self, req: RegisterRequest) -> AppResult<User> {
        if req.username.trim().is_empty() || req.email.trim().is_empty() {
            return Err(AppError::validation("Username and email are required"));
        }
        if self.users.find_by_username(&req.username).await?.is_some() {
            return Err(AppError::conflict("Username already registered"));
        }
        if self.users.find_by_email(&req.email).await?.is_some() {
            return Err(AppError::conflict("Email already registered"));
        }
        if req.password != req.confirm_password {
            return Err(AppError::validation("Passwords do not match"));
        }
        if age_on(req.birthdate, Utc::now().date_naive()) < self.min_age_years {
            return Err(AppError::validation(format!(
                "You must be at least {} years old to register",
                self.min_age_years
            )));
        }

        let password_hash = self.hasher.hash_password(&req.password)?;
        let user = self
            .users
            .create(&NewUser {
                username: req.username,
                email: req.email,
                password_hash,
                birthdate: req.birthdate,
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Verifies credentials and opens a new session.
    pub async fn login(&self, req: LoginRequest) -> AppResult<TokenPair> {
        let invalid = || AppError::unauthorized("Invalid username or password");

        let Some(user) = self.users.find_by_username(&req.username).await? else {
            warn!(username = %req.username, "Login failed: unknown user");
            return Err(invalid());
        };
        if !self.hasher.verify_password(&req.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(invalid());
        }

        let pair = self.tokens.issue(&user).await?;
        info!(user_id = %user.id, session_id = %pair.session_id, "User logged in");
        Ok(pair)
    }

    /// Resolves an access credential into a request context.
    pub async fn authenticate(&self, access_token: &str) -> AppResult<RequestContext> {
        Ok(self.tokens.authenticate(access_token).await?.into())
    }

    /// The owner of an access credential.
    pub async fn me(&self, access_token: &str) -> AppResult<User> {
        self.tokens.validate(access_token).await
    }

    /// Ends the session of an access credential.
    pub async fn logout(&self, access_token: &str) -> AppResult<()> {
        self.tokens.revoke(access_token).await
    }

    /// Ends every session of the credential's owner. Returns how many ended.
    pub async fn logout_all(&self, access_token: &str) -> AppResult<u64> {
        self.tokens.revoke_all(access_token).await
    }

    /// The owner's other live sessions.
    pub async fn active_tokens(&self, access_token: &str) -> AppResult<Vec<TokenSummary>> {
        self.tokens.list_active(access_token).await
    }

    /// Exchanges a refresh credential for a new pair.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        self.tokens.refresh(refresh_token).await
    }

    /// Changes the acting user's password.
    pub async fn change_password(&self, ctx: &RequestContext, req: ChangePasswordRequest) -> AppResult<()> {
        let user = ctx.require_user()?;

        if !self.hasher.verify_password(&req.old_password, &user.password_hash)? {
            return Err(AppError::validation("Incorrect old password"));
        }
        if req.new_password != req.confirm_password {
            return Err(AppError::validation("Passwords do not match"));
        }
        if req.new_password == req.old_password {
            return Err(AppError::validation(
                "New password must differ from the old password",
            ));
        }

        let password_hash = self.hasher.hash_password(&req.new_password)?;
        if !self.users.update_password(user.id, &password_hash).await? {
            return Err(AppError::not_found(format!("No user with id {}", user.id)));
        }

        info!(user_id = %user.id, "Password changed");
        Ok(())
    }
}
