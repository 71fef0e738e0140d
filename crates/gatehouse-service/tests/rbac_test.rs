//! Scenario tests for the policy graph and permission resolution.

mod helpers;

use gatehouse_core::config::{RbacConfig, TokenConfig};
use gatehouse_core::error::ErrorKind;
use gatehouse_entity::policy::CatalogChanges;
use gatehouse_service::RequestContext;

#[tokio::test]
async fn test_admin_holds_read_x_until_role_soft_deleted() {
    let t = helpers::TestApp::new();
    let sys = RequestContext::system();
    let admin = t.create_test_user("Admin", "password123").await;

    let role = t.create_role("Admin", "ADMIN").await;
    let permission = t.create_permission("ReadX", "read-x").await;
    t.app.grants.grant(&sys, role.id, permission.id).await.unwrap();
    t.app.user_roles.assign(&sys, admin.id, &[role.id]).await.unwrap();

    assert!(t.app.resolver.has_permission("read-x", &admin).await.is_ok());

    t.app.roles.soft_delete(&sys, role.id).await.unwrap();
    let err = t
        .app
        .resolver
        .has_permission("read-x", &admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);
    assert_eq!(err.message, "Permission denied: read-x");
}

#[tokio::test]
async fn test_soft_deleting_any_hop_breaks_the_chain() {
    for hop in 0..4 {
        let t = helpers::TestApp::new();
        let sys = RequestContext::system();
        let user = t.create_test_user("chain", "password123").await;
        let (role, permission) = t.create_chain(&user, "read-x").await;
        assert!(t.holds(&user, "read-x").await);

        match hop {
            0 => {
                t.app.user_roles.soft_delete(&sys, user.id, role.id).await.unwrap();
            }
            1 => {
                t.app.roles.soft_delete(&sys, role.id).await.unwrap();
            }
            2 => {
                t.app.grants.soft_delete(&sys, role.id, permission.id).await.unwrap();
            }
            _ => {
                t.app.permissions.soft_delete(&sys, permission.id).await.unwrap();
            }
        }
        assert!(!t.holds(&user, "read-x").await, "hop {hop}");

        match hop {
            0 => {
                t.app.user_roles.restore(&sys, user.id, role.id).await.unwrap();
            }
            1 => {
                t.app.roles.restore(&sys, role.id).await.unwrap();
            }
            2 => {
                t.app.grants.restore(&sys, role.id, permission.id).await.unwrap();
            }
            _ => {
                t.app.permissions.restore(&sys, permission.id).await.unwrap();
            }
        }
        assert!(t.holds(&user, "read-x").await, "hop {hop}");
    }
}

#[tokio::test]
async fn test_cached_resolution_sees_policy_mutations() {
    let t = helpers::TestApp::with_config(
        TokenConfig::default(),
        RbacConfig {
            cache_ttl_seconds: 300,
            cache_capacity: 100,
        },
    );
    let sys = RequestContext::system();
    let user = t.create_test_user("cached", "password123").await;
    let (role, _) = t.create_chain(&user, "read-x").await;

    assert!(t.holds(&user, "read-x").await);
    t.app.roles.soft_delete(&sys, role.id).await.unwrap();
    assert!(!t.holds(&user, "read-x").await);
}

#[tokio::test]
async fn test_soft_delete_and_restore_round_trip() {
    let t = helpers::TestApp::new();
    let sys = RequestContext::system();

    let mut data = helpers::entry("Editor", "EDITOR");
    data.description = Some("Edits things".to_string());
    let original = t.app.roles.create(&sys, data).await.unwrap();

    let deleted = t.app.roles.soft_delete(&sys, original.id).await.unwrap();
    assert!(deleted.deleted_at.is_some());
    assert!(deleted.deleted_by.is_some());

    assert_eq!(
        t.app.roles.get(&sys, original.id).await.unwrap_err().kind,
        ErrorKind::NotFound
    );
    assert!(t.app.roles.list(&sys).await.unwrap().is_empty());
    assert_eq!(
        t.app.roles.soft_delete(&sys, original.id).await.unwrap_err().kind,
        ErrorKind::NotFound
    );

    let restored = t.app.roles.restore(&sys, original.id).await.unwrap();
    assert_eq!(restored, original);
    assert!(restored.deleted_at.is_none() && restored.deleted_by.is_none());

    let err = t.app.roles.restore(&sys, original.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let t = helpers::TestApp::new();
    let sys = RequestContext::system();
    let id = uuid::Uuid::new_v4();

    assert_eq!(t.app.roles.restore(&sys, id).await.unwrap_err().kind, ErrorKind::NotFound);
    assert_eq!(t.app.roles.delete(&sys, id).await.unwrap_err().kind, ErrorKind::NotFound);
    assert_eq!(t.app.permissions.get(&sys, id).await.unwrap_err().kind, ErrorKind::NotFound);
    assert_eq!(
        t.app
            .permissions
            .update(&sys, id, CatalogChanges::default())
            .await
            .unwrap_err()
            .kind,
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_uniqueness_applies_to_live_rows_only() {
    let t = helpers::TestApp::new();
    let sys = RequestContext::system();

    let first = t.create_role("Admin", "ADMIN").await;
    let err = t
        .app
        .roles
        .create(&sys, helpers::entry("Administrator", "ADMIN"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    t.app.roles.soft_delete(&sys, first.id).await.unwrap();
    let second = t.create_role("Admin", "ADMIN").await;
    assert_ne!(second.id, first.id);

    // Restoring would create a second live ADMIN.
    let err = t.app.roles.restore(&sys, first.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_update_checks_only_changed_fields() {
    let t = helpers::TestApp::new();
    let sys = RequestContext::system();
    let admin = t.create_role("Admin", "ADMIN").await;
    t.create_role("User", "USER").await;

    let unchanged = t
        .app
        .roles
        .update(
            &sys,
            admin.id,
            CatalogChanges {
                name: Some("Admin".to_string()),
                code: Some("ADMIN".to_string()),
                ..CatalogChanges::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(unchanged, admin);

    let err = t
        .app
        .roles
        .update(
            &sys,
            admin.id,
            CatalogChanges {
                code: Some("USER".to_string()),
                ..CatalogChanges::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let renamed = t
        .app
        .roles
        .update(
            &sys,
            admin.id,
            CatalogChanges {
                name: Some("Administrators".to_string()),
                description: Some(Some("Full access".to_string())),
                ..CatalogChanges::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Administrators");
    assert_eq!(renamed.description.as_deref(), Some("Full access"));
    assert_eq!(renamed.code, "ADMIN");
}

#[tokio::test]
async fn test_hard_delete_cascades_to_links() {
    let t = helpers::TestApp::new();
    let sys = RequestContext::system();
    let user = t.create_test_user("cascade", "password123").await;
    let (role, permission) = t.create_chain(&user, "read-x").await;

    t.app.roles.delete(&sys, role.id).await.unwrap();

    assert!(!t.holds(&user, "read-x").await);
    assert!(t.app.user_roles.roles_of(&sys, user.id).await.unwrap().is_empty());
    assert!(
        t.app
            .stores
            .role_permissions
            .find(role.id, permission.id)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        t.app
            .stores
            .user_roles
            .find(user.id, role.id)
            .await
            .unwrap()
            .is_none()
    );
    // The permission itself survives.
    assert_eq!(t.app.permissions.get(&sys, permission.id).await.unwrap().id, permission.id);
}

#[tokio::test]
async fn test_assign_replaces_roles() {
    let t = helpers::TestApp::new();
    let sys = RequestContext::system();
    let user = t.create_test_user("assignee", "password123").await;
    let a = t.create_role("A", "A").await;
    let b = t.create_role("B", "B").await;

    let links = t
        .app
        .user_roles
        .assign(&sys, user.id, &[a.id, b.id, a.id])
        .await
        .unwrap();
    assert_eq!(links.len(), 2);

    t.app.user_roles.assign(&sys, user.id, &[b.id]).await.unwrap();
    let roles = t.app.user_roles.roles_of(&sys, user.id).await.unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].id, b.id);

    let err = t
        .app
        .user_roles
        .assign(&sys, user.id, &[a.id, uuid::Uuid::new_v4()])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    // A failed assignment leaves the previous links in place.
    assert_eq!(t.app.user_roles.roles_of(&sys, user.id).await.unwrap().len(), 1);

    t.app.roles.soft_delete(&sys, a.id).await.unwrap();
    let err = t.app.user_roles.assign(&sys, user.id, &[a.id]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = t
        .app
        .user_roles
        .assign(&sys, uuid::Uuid::new_v4(), &[b.id])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_link_remove_and_restore_rules() {
    let t = helpers::TestApp::new();
    let sys = RequestContext::system();
    let user = t.create_test_user("linker", "password123").await;
    let (role, permission) = t.create_chain(&user, "read-x").await;

    let err = t.app.grants.grant(&sys, role.id, permission.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let err = t.app.user_roles.restore(&sys, user.id, role.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    t.app.user_roles.remove(&sys, user.id, role.id).await.unwrap();
    let err = t.app.user_roles.remove(&sys, user.id, role.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    let err = t.app.user_roles.restore(&sys, user.id, role.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let granted = t.app.grants.permissions_of(&sys, role.id).await.unwrap();
    assert_eq!(granted.len(), 1);
    t.app.grants.set_permissions(&sys, role.id, &[]).await.unwrap();
    assert!(t.app.grants.permissions_of(&sys, role.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_operations_require_permission_codes() {
    let t = helpers::TestApp::new();
    let guest = t.user_with_role("guest", "GUEST").await;

    assert_eq!(t.app.user_roles.list_users(&guest).await.unwrap().len(), 1);

    let err = t.app.roles.list(&guest).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);
    assert_eq!(err.status_code(), 403);
    assert_eq!(err.message, "Permission denied: get-list-role");

    let err = t
        .app
        .permissions
        .create(&guest, helpers::entry("X", "x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    let admin = t.user_with_role("root", "ADMIN").await;
    assert_eq!(t.app.roles.list(&admin).await.unwrap().len(), 3);
    let created = t
        .app
        .permissions
        .create(&admin, helpers::entry("X", "x"))
        .await
        .unwrap();
    assert_eq!(created.created_by, admin.actor_id());
}

#[tokio::test]
async fn test_history_and_revert() {
    let t = helpers::TestApp::new();
    let sys = RequestContext::system();
    let role = t.create_role("Admin", "ADMIN").await;

    t.app
        .roles
        .update(
            &sys,
            role.id,
            CatalogChanges {
                name: Some("Administrators".to_string()),
                ..CatalogChanges::default()
            },
        )
        .await
        .unwrap();
    t.app.roles.soft_delete(&sys, role.id).await.unwrap();

    let history = t.app.roles.history(&sys, role.id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].log.action, "create");
    assert_eq!(history[1].log.action, "update");
    assert_eq!(history[1].changes.len(), 1);
    assert!(history[1].changes.contains_key("name"));
    assert_eq!(history[2].log.action, "soft_delete");

    let err = t.app.roles.revert(&sys, history[0].log.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    // Undoing the soft delete brings the role back.
    let restored = t.app.roles.revert(&sys, history[2].log.id).await.unwrap();
    assert!(restored.deleted_at.is_none());
    assert_eq!(restored.name, "Administrators");

    // Undoing the rename restores the old name.
    let reverted = t.app.roles.revert(&sys, history[1].log.id).await.unwrap();
    assert_eq!(reverted.name, "Admin");
    assert_eq!(reverted.code, "ADMIN");

    let err = t.app.permissions.revert(&sys, history[1].log.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_revert_leaves_entry_untouched_on_conflict() {
    let t = helpers::TestApp::new();
    let sys = RequestContext::system();
    let role = t.create_role("Auditors", "AUDITOR").await;

    t.app
        .roles
        .update(
            &sys,
            role.id,
            CatalogChanges {
                name: Some("Reviewers".to_string()),
                ..CatalogChanges::default()
            },
        )
        .await
        .unwrap();
    t.app.roles.soft_delete(&sys, role.id).await.unwrap();
    t.create_role("Auditors", "AUDITOR_2").await;

    let history = t.app.roles.history(&sys, role.id).await.unwrap();
    assert_eq!(history[1].log.action, "update");

    // The rename back would collide with the live "Auditors" role.
    let err = t.app.roles.revert(&sys, history[1].log.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let stored = t.app.stores.roles.find_by_id(role.id).await.unwrap().unwrap();
    assert!(stored.deleted_at.is_some());
    assert_eq!(stored.name, "Reviewers");
    assert_eq!(t.app.roles.history(&sys, role.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_revert_of_update_on_deleted_entry_restores_it_in_one_entry() {
    let t = helpers::TestApp::new();
    let sys = RequestContext::system();
    let role = t.create_role("Auditors", "AUDITOR").await;

    t.app
        .roles
        .update(
            &sys,
            role.id,
            CatalogChanges {
                name: Some("Reviewers".to_string()),
                ..CatalogChanges::default()
            },
        )
        .await
        .unwrap();
    t.app.roles.soft_delete(&sys, role.id).await.unwrap();

    let history = t.app.roles.history(&sys, role.id).await.unwrap();
    let reverted = t.app.roles.revert(&sys, history[1].log.id).await.unwrap();
    assert!(reverted.deleted_at.is_none());
    assert!(reverted.deleted_by.is_none());
    assert_eq!(reverted.name, "Auditors");

    let history = t.app.roles.history(&sys, role.id).await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[3].log.action, "revert");
    assert!(history[3].changes.contains_key("name"));
    assert!(history[3].changes.contains_key("deleted_at"));
}

#[tokio::test]
async fn test_seed_is_idempotent() {
    let t = helpers::TestApp::new();

    let first = t.app.seed().await.unwrap();
    assert_eq!(first.roles_created, 3);
    assert_eq!(first.permissions_created, 18);
    assert_eq!(first.grants_created, 18 + 3 + 1);

    let second = t.app.seed().await.unwrap();
    assert_eq!(second.roles_created, 0);
    assert_eq!(second.permissions_created, 0);
    assert_eq!(second.grants_created, 0);

    let sys = RequestContext::system();
    assert_eq!(t.app.roles.list(&sys).await.unwrap().len(), 3);
    assert_eq!(t.app.permissions.list(&sys).await.unwrap().len(), 18);
}
