//! Scenario tests for account operations.

mod helpers;

use chrono::{Duration, NaiveDate, Utc};

use gatehouse_core::error::ErrorKind;
use gatehouse_service::{ChangePasswordRequest, LoginRequest, RegisterRequest};

fn register_request(username: &str, birthdate: NaiveDate) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password: "password123".to_string(),
        confirm_password: "password123".to_string(),
        birthdate,
    }
}

#[tokio::test]
async fn test_register_login_validate_logout() {
    let t = helpers::TestApp::new();
    let alice = t
        .app
        .accounts
        .register(register_request(
            "alice",
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
        ))
        .await
        .unwrap();

    let pair = t.login("alice", "password123").await;
    let me = t.app.accounts.me(&pair.access_token).await.unwrap();
    assert_eq!(me.id, alice.id);
    assert_eq!(me.username, "alice");

    t.app.accounts.logout(&pair.access_token).await.unwrap();
    let err = t.app.accounts.me(&pair.access_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_register_rejects_duplicates() {
    let t = helpers::TestApp::new();
    t.create_test_user("bob", "password123").await;

    let err = t
        .app
        .accounts
        .register(register_request("BOB", NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let mut req = register_request("robert", NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());
    req.email = "Bob@Example.com".to_string();
    let err = t.app.accounts.register(req).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_register_validates_password_and_age() {
    let t = helpers::TestApp::new();

    let mut req = register_request("carol", NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());
    req.confirm_password = "different".to_string();
    let err = t.app.accounts.register(req).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let ten_years_ago = Utc::now().date_naive() - Duration::days(365 * 10);
    let err = t
        .app
        .accounts
        .register(register_request("young", ten_years_ago))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let t = helpers::TestApp::new();
    t.create_test_user("dave", "password123").await;

    for (username, password) in [("dave", "wrong-password"), ("nobody", "password123")] {
        let err = t
            .app
            .accounts
            .login(LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert_eq!(err.message, "Invalid username or password");
    }
}

#[tokio::test]
async fn test_change_password() {
    let t = helpers::TestApp::new();
    t.create_test_user("erin", "password123").await;
    let ctx = t.context_for("erin", "password123").await;

    let change = |old: &str, new: &str, confirm: &str| ChangePasswordRequest {
        old_password: old.to_string(),
        new_password: new.to_string(),
        confirm_password: confirm.to_string(),
    };

    let err = t
        .app
        .accounts
        .change_password(&ctx, change("wrong", "newpass456", "newpass456"))
        .await
        .unwrap_err();
    assert_eq!(err.message, "Incorrect old password");

    let err = t
        .app
        .accounts
        .change_password(&ctx, change("password123", "newpass456", "other"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = t
        .app
        .accounts
        .change_password(&ctx, change("password123", "password123", "password123"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    t.app
        .accounts
        .change_password(&ctx, change("password123", "newpass456", "newpass456"))
        .await
        .unwrap();

    t.login("erin", "newpass456").await;
    let err = t
        .app
        .accounts
        .login(LoginRequest {
            username: "erin".to_string(),
            password: "password123".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_logout_all_and_active_tokens() {
    let t = helpers::TestApp::new();
    t.create_test_user("frank", "password123").await;

    let first = t.login("frank", "password123").await;
    let second = t.login("frank", "password123").await;

    let others = t.app.accounts.active_tokens(&first.access_token).await.unwrap();
    assert_eq!(others.len(), 1);
    assert_eq!(others[0].session_id, second.session_id);

    let refreshed = t.app.accounts.refresh(&second.refresh_token).await.unwrap();
    assert_eq!(t.app.accounts.logout_all(&refreshed.access_token).await.unwrap(), 2);
    assert!(t.app.accounts.me(&first.access_token).await.is_err());
}
