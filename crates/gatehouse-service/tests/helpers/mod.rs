//! Shared helpers for service scenario tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use uuid::Uuid;

use gatehouse_auth::TokenPair;
use gatehouse_core::config::{AuthConfig, RbacConfig, TokenConfig};
use gatehouse_database::Stores;
use gatehouse_entity::policy::{NewCatalogEntry, Permission, Role};
use gatehouse_entity::user::User;
use gatehouse_service::{Gatehouse, LoginRequest, RegisterRequest, RequestContext};

/// Services wired over fresh in-memory stores.
pub struct TestApp {
    pub app: Gatehouse,
}

impl TestApp {
    /// Default configuration.
    pub fn new() -> Self {
        Self::with_config(TokenConfig::default(), RbacConfig::default())
    }

    /// Custom token settings.
    pub fn with_tokens(token: TokenConfig) -> Self {
        Self::with_config(token, RbacConfig::default())
    }

    pub fn with_config(token: TokenConfig, rbac: RbacConfig) -> Self {
        let auth = AuthConfig {
            jwt_secret: "test-secret-key-for-gatehouse".to_string(),
            ..AuthConfig::default()
        };
        Self {
            app: Gatehouse::with_settings(Stores::in_memory(), &auth, &token, &rbac),
        }
    }

    /// Registers a user born on 1990-01-01.
    pub async fn create_test_user(&self, username: &str, password: &str) -> User {
        self.app
            .accounts
            .register(RegisterRequest {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: password.to_string(),
                confirm_password: password.to_string(),
                birthdate: NaiveDate::from_ymd_opt(1990, 1, 1).expect("valid date"),
            })
            .await
            .expect("Failed to register test user")
    }

    /// Logs in through the account service.
    pub async fn login(&self, username: &str, password: &str) -> TokenPair {
        self.app
            .accounts
            .login(LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await
            .expect("Failed to login")
    }

    /// Context of a freshly logged-in user.
    pub async fn context_for(&self, username: &str, password: &str) -> RequestContext {
        let pair = self.login(username, password).await;
        self.app
            .accounts
            .authenticate(&pair.access_token)
            .await
            .expect("Failed to authenticate")
    }

    pub async fn create_role(&self, name: &str, code: &str) -> Role {
        self.app
            .roles
            .create(&RequestContext::system(), entry(name, code))
            .await
            .expect("Failed to create role")
    }

    pub async fn create_permission(&self, name: &str, code: &str) -> Permission {
        self.app
            .permissions
            .create(&RequestContext::system(), entry(name, code))
            .await
            .expect("Failed to create permission")
    }

    /// Builds the chain user -> role -> permission and returns the ids.
    pub async fn create_chain(&self, user: &User, code: &str) -> (Role, Permission) {
        let sys = RequestContext::system();
        let role = self.create_role(&format!("Role {code}"), &format!("ROLE_{code}")).await;
        let permission = self.create_permission(&format!("Permission {code}"), code).await;

        self.app
            .grants
            .grant(&sys, role.id, permission.id)
            .await
            .expect("Failed to grant permission");
        self.app
            .user_roles
            .assign(&sys, user.id, &[role.id])
            .await
            .expect("Failed to assign role");

        (role, permission)
    }

    /// Whether `user` currently holds `code`.
    pub async fn holds(&self, user: &User, code: &str) -> bool {
        self.app
            .resolver
            .check(code, user)
            .await
            .expect("Failed to resolve permissions")
    }

    /// Seeds the built-in policy and returns a logged-in user holding `role_code`.
    pub async fn user_with_role(&self, username: &str, role_code: &str) -> RequestContext {
        self.app.seed().await.expect("Failed to seed");
        let user = self.create_test_user(username, "password123").await;
        let role: Uuid = self
            .app
            .stores
            .roles
            .find_live_by_code(role_code)
            .await
            .expect("Failed to look up role")
            .expect("Seeded role missing")
            .id;
        self.app
            .user_roles
            .assign(&RequestContext::system(), user.id, &[role])
            .await
            .expect("Failed to assign role");
        self.context_for(username, "password123").await
    }
}

pub fn entry(name: &str, code: &str) -> NewCatalogEntry {
    NewCatalogEntry {
        name: name.to_string(),
        description: None,
        code: code.to_string(),
    }
}
