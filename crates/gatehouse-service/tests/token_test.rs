//! Scenario tests for the token lifecycle.

mod helpers;

use std::time::Duration;

use chrono::Utc;

use gatehouse_core::config::{OverflowStrategy, TokenConfig, TokenScheme};
use gatehouse_core::error::ErrorKind;

fn config(scheme: TokenScheme, ceiling: u32, strategy: OverflowStrategy) -> TokenConfig {
    TokenConfig {
        scheme,
        max_active_per_user: ceiling,
        overflow_strategy: strategy,
        ..TokenConfig::default()
    }
}

/// Distinct creation timestamps keep eviction order deterministic.
async fn tick() {
    tokio::time::sleep(Duration::from_millis(2)).await;
}

#[tokio::test]
async fn test_ceiling_evicts_oldest_session() {
    let t = helpers::TestApp::with_tokens(config(TokenScheme::Jwt, 3, OverflowStrategy::EvictOldest));
    let user = t.create_test_user("carol", "password123").await;

    let mut pairs = Vec::new();
    for _ in 0..4 {
        pairs.push(t.app.tokens.issue(&user).await.unwrap());
        tick().await;
    }

    let active = t
        .app
        .stores
        .tokens
        .count_active(user.id, Utc::now())
        .await
        .unwrap();
    assert_eq!(active, 3);

    let err = t.app.tokens.validate(&pairs[0].access_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    for pair in &pairs[1..] {
        assert_eq!(t.app.tokens.validate(&pair.access_token).await.unwrap().id, user.id);
    }

    let evicted = t
        .app
        .stores
        .tokens
        .find_by_session_id(pairs[0].session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(evicted.revoked_reason.as_deref(), Some("evicted"));
}

#[tokio::test]
async fn test_ceiling_rejects_when_configured() {
    let t = helpers::TestApp::with_tokens(config(TokenScheme::Jwt, 2, OverflowStrategy::Reject));
    let user = t.create_test_user("dave", "password123").await;

    let first = t.app.tokens.issue(&user).await.unwrap();
    t.app.tokens.issue(&user).await.unwrap();

    let err = t.app.tokens.issue(&user).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimited);
    assert_eq!(err.status_code(), 429);

    // Freeing a slot makes room again.
    t.app.tokens.revoke(&first.access_token).await.unwrap();
    assert!(t.app.tokens.issue(&user).await.is_ok());
}

#[tokio::test]
async fn test_zero_ceiling_is_unlimited() {
    let t = helpers::TestApp::with_tokens(config(TokenScheme::Jwt, 0, OverflowStrategy::Reject));
    let user = t.create_test_user("erin", "password123").await;

    for _ in 0..8 {
        t.app.tokens.issue(&user).await.unwrap();
    }
    assert_eq!(
        t.app.stores.tokens.count_active(user.id, Utc::now()).await.unwrap(),
        8
    );
}

#[tokio::test]
async fn test_refresh_replay_revokes_family() {
    let t = helpers::TestApp::new();
    let user = t.create_test_user("frank", "password123").await;

    let original = t.app.tokens.issue(&user).await.unwrap();
    let rotated = t.app.tokens.refresh(&original.refresh_token).await.unwrap();
    assert_ne!(rotated.session_id, original.session_id);
    assert_eq!(t.app.tokens.validate(&rotated.access_token).await.unwrap().id, user.id);

    let err = t.app.tokens.refresh(&original.refresh_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    assert!(t.app.tokens.validate(&original.access_token).await.is_err());
    assert!(t.app.tokens.validate(&rotated.access_token).await.is_err());
    assert!(t.app.tokens.refresh(&rotated.refresh_token).await.is_err());

    let successor = t
        .app
        .stores
        .tokens
        .find_by_session_id(rotated.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(successor.revoked_reason.as_deref(), Some("refresh_reuse"));
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let t = helpers::TestApp::new();
    let user = t.create_test_user("gina", "password123").await;
    let pair = t.app.tokens.issue(&user).await.unwrap();

    let err = t.app.tokens.refresh(&pair.access_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert!(t.app.tokens.validate(&pair.refresh_token).await.is_err());
}

#[tokio::test]
async fn test_revoke_all_invalidates_every_session() {
    let t = helpers::TestApp::new();
    let user = t.create_test_user("hank", "password123").await;

    let mut pairs = Vec::new();
    for _ in 0..3 {
        pairs.push(t.app.tokens.issue(&user).await.unwrap());
    }

    let count = t.app.tokens.revoke_all(&pairs[1].access_token).await.unwrap();
    assert_eq!(count, 3);
    for pair in &pairs {
        assert!(t.app.tokens.validate(&pair.access_token).await.is_err());
    }
}

#[tokio::test]
async fn test_list_active_excludes_presented_session() {
    let t = helpers::TestApp::new();
    let user = t.create_test_user("iris", "password123").await;

    let current = t.app.tokens.issue(&user).await.unwrap();
    let other = t.app.tokens.issue(&user).await.unwrap();
    let revoked = t.app.tokens.issue(&user).await.unwrap();
    t.app.tokens.revoke(&revoked.access_token).await.unwrap();

    let sessions = t.app.tokens.list_active(&current.access_token).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].session_id, other.session_id);
}

#[tokio::test]
async fn test_revoke_is_idempotent() {
    let t = helpers::TestApp::new();
    let user = t.create_test_user("jack", "password123").await;
    let pair = t.app.tokens.issue(&user).await.unwrap();

    t.app.tokens.revoke(&pair.access_token).await.unwrap();
    t.app.tokens.revoke(&pair.access_token).await.unwrap();

    let err = t.app.tokens.validate(&pair.access_token).await.unwrap_err();
    assert_eq!(err.message, "Token has been revoked");
    assert!(t.app.tokens.revoke("not-a-token").await.is_err());
}

#[tokio::test]
async fn test_zero_ttl_access_token_is_expired() {
    let t = helpers::TestApp::with_tokens(TokenConfig {
        access_ttl_minutes: 0,
        ..TokenConfig::default()
    });
    let user = t.create_test_user("kate", "password123").await;
    let pair = t.app.tokens.issue(&user).await.unwrap();

    let err = t.app.tokens.validate(&pair.access_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    // An expired access token can still be revoked, and refresh still works.
    let refreshed = t.app.tokens.refresh(&pair.refresh_token).await.unwrap();
    t.app.tokens.revoke(&refreshed.access_token).await.unwrap();
}

#[tokio::test]
async fn test_tampered_or_empty_tokens_are_rejected() {
    let t = helpers::TestApp::new();
    let user = t.create_test_user("liam", "password123").await;
    let pair = t.app.tokens.issue(&user).await.unwrap();

    let mut tampered = pair.access_token.clone();
    tampered.push('x');

    for raw in ["", "   ", "garbage", tampered.as_str()] {
        let err = t.app.tokens.validate(raw).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized, "{raw:?}");
    }
}

async fn lifecycle(scheme: TokenScheme) {
    let t = helpers::TestApp::with_tokens(config(scheme, 5, OverflowStrategy::EvictOldest));
    let user = t.create_test_user("mona", "password123").await;

    let pair = t.app.tokens.issue(&user).await.unwrap();
    assert_eq!(pair.token_type, "bearer");
    assert_eq!(t.app.tokens.validate(&pair.access_token).await.unwrap().id, user.id);

    let second = t.app.tokens.issue(&user).await.unwrap();
    let rotated = t.app.tokens.refresh(&pair.refresh_token).await.unwrap();
    assert!(t.app.tokens.validate(&pair.access_token).await.is_err());

    let sessions = t.app.tokens.list_active(&rotated.access_token).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].session_id, second.session_id);

    t.app.tokens.revoke(&rotated.access_token).await.unwrap();
    assert!(t.app.tokens.validate(&rotated.access_token).await.is_err());

    assert_eq!(t.app.tokens.revoke_all(&second.access_token).await.unwrap(), 1);
    assert!(t.app.tokens.validate(&second.access_token).await.is_err());
}

#[tokio::test]
async fn test_jwt_scheme_lifecycle() {
    lifecycle(TokenScheme::Jwt).await;
}

#[tokio::test]
async fn test_opaque_scheme_lifecycle() {
    lifecycle(TokenScheme::Opaque).await;
}

#[tokio::test]
async fn test_purge_removes_revoked_records() {
    let t = helpers::TestApp::new();
    let user = t.create_test_user("nate", "password123").await;

    let revoked = t.app.tokens.issue(&user).await.unwrap();
    let kept = t.app.tokens.issue(&user).await.unwrap();
    t.app.tokens.revoke(&revoked.access_token).await.unwrap();

    let purged = t
        .app
        .tokens
        .purge_expired(Utc::now() + chrono::Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(purged, 1);
    assert!(t.app.stores.tokens.find_by_session_id(revoked.session_id).await.unwrap().is_none());
    assert!(t.app.tokens.validate(&kept.access_token).await.is_ok());
}

#[tokio::test]
async fn test_out_of_range_ttl_is_a_configuration_error() {
    let t = helpers::TestApp::with_tokens(TokenConfig {
        refresh_ttl_hours: 10_000_000_000,
        ..TokenConfig::default()
    });
    let user = t.create_test_user("olga", "password123").await;

    let err = t.app.tokens.issue(&user).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
    assert_eq!(
        t.app.stores.tokens.count_active(user.id, Utc::now()).await.unwrap(),
        0
    );

    let t = helpers::TestApp::with_tokens(TokenConfig {
        access_ttl_minutes: u64::MAX,
        ..TokenConfig::default()
    });
    let user = t.create_test_user("pavel", "password123").await;
    let err = t.app.tokens.issue(&user).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_issue_never_exceeds_ceiling() {
    let t = helpers::TestApp::with_tokens(config(TokenScheme::Jwt, 3, OverflowStrategy::EvictOldest));
    let user = t.create_test_user("quinn", "password123").await;

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let app = t.app.clone();
            let user = user.clone();
            tokio::spawn(async move { app.tokens.issue(&user).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let active = t
        .app
        .stores
        .tokens
        .count_active(user.id, Utc::now())
        .await
        .unwrap();
    assert_eq!(active, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_issue_with_reject_admits_exactly_ceiling() {
    let t = helpers::TestApp::with_tokens(config(TokenScheme::Opaque, 3, OverflowStrategy::Reject));
    let user = t.create_test_user("rosa", "password123").await;

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let app = t.app.clone();
            let user = user.clone();
            tokio::spawn(async move { app.tokens.issue(&user).await })
        })
        .collect();

    let mut accepted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(e) => assert_eq!(e.kind, ErrorKind::RateLimited),
        }
    }
    assert_eq!(accepted, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_refresh_of_one_token_succeeds_once() {
    let t = helpers::TestApp::new();
    let user = t.create_test_user("sven", "password123").await;
    let original = t.app.tokens.issue(&user).await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let app = t.app.clone();
            let refresh = original.refresh_token.clone();
            tokio::spawn(async move { app.tokens.refresh(&refresh).await })
        })
        .collect();

    let mut rotated = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => rotated += 1,
            Err(e) => assert_eq!(e.kind, ErrorKind::Unauthorized),
        }
    }
    assert_eq!(rotated, 1);
}
