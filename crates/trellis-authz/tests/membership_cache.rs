mod common;

use std::sync::Arc;
use std::time::Duration;
use trellis_authz::store::cached::CachedMembershipStore;
use trellis_authz::{ACTION_RETRIEVE, Authorizer, PermissionCatalog, PolicyRegistry, Role};

fn cached_authorizer(cache: &CachedMembershipStore) -> Authorizer {
    Authorizer::new(
        Arc::new(cache.clone()),
        Arc::new(PermissionCatalog::builtin()),
        Arc::new(PolicyRegistry::reference()),
    )
}

#[tokio::test]
async fn stale_entries_need_invalidation() {
    let fx = common::fixture().await;
    let cache = CachedMembershipStore::new(fx.store.clone(), Duration::from_secs(60));
    let authz = cached_authorizer(&cache);
    let member_id = fx.member.user_id().expect("member id");

    let before = authz
        .authorize(&fx.member, &fx.private2, ACTION_RETRIEVE)
        .await
        .expect("decision");
    assert!(before.is_allowed());

    fx.store
        .remove_membership(member_id, fx.private2.id)
        .await
        .expect("remove");
    let stale = authz
        .authorize(&fx.member, &fx.private2, ACTION_RETRIEVE)
        .await
        .expect("decision");
    assert!(stale.is_allowed());

    cache.invalidate_membership(member_id, fx.private2.id);
    let after = authz
        .authorize(&fx.member, &fx.private2, ACTION_RETRIEVE)
        .await
        .expect("decision");
    assert!(!after.is_allowed());
}

#[tokio::test]
async fn role_changes_apply_after_project_invalidation() {
    let fx = common::fixture().await;
    let cache = CachedMembershipStore::new(fx.store.clone(), Duration::from_secs(60));
    let authz = cached_authorizer(&cache);
    let member_id = fx.member.user_id().expect("member id");

    let perms = authz
        .permissions_for(&fx.member, &fx.private2)
        .await
        .expect("perms");
    assert!(perms.contains("view_project"));

    fx.store
        .update_role(
            member_id,
            fx.private2.id,
            Role::new(fx.private2.id, "reporter", ["add_issue"]),
        )
        .await
        .expect("update role");
    cache.invalidate_project(fx.private2.id);

    let perms = authz
        .permissions_for(&fx.member, &fx.private2)
        .await
        .expect("perms");
    assert!(!perms.contains("view_project"));
    assert!(perms.contains("add_issue"));
}

#[tokio::test]
async fn entries_expire_after_ttl() {
    let fx = common::fixture().await;
    let cache = CachedMembershipStore::new(fx.store.clone(), Duration::from_millis(20));
    let authz = cached_authorizer(&cache);
    let member_id = fx.member.user_id().expect("member id");

    authz
        .authorize(&fx.member, &fx.private1, ACTION_RETRIEVE)
        .await
        .expect("decision");
    fx.store
        .remove_membership(member_id, fx.private1.id)
        .await
        .expect("remove");
    tokio::time::sleep(Duration::from_millis(40)).await;

    let decision = authz
        .authorize(&fx.member, &fx.private1, ACTION_RETRIEVE)
        .await
        .expect("decision");
    assert!(!decision.is_allowed());
}
