#![allow(dead_code)]

use std::sync::Arc;
use trellis_authz::store::memory::InMemoryMembershipStore;
use trellis_authz::{
    ANON_PERMISSIONS, Authorizer, Membership, PermissionCatalog, PolicyRegistry, Project,
    Resolvable, Role, Subject, USER_PERMISSIONS,
};
use trellis_common::ids::UserId;

/// Three projects owned by the same user, a member in all of them, and a
/// registered user who belongs to none. The owner also holds a co-owner
/// membership with the member role's permissions.
pub struct Fixture {
    pub authz: Authorizer,
    pub store: Arc<InMemoryMembershipStore>,
    pub owner: Subject,
    pub member: Subject,
    pub registered: Subject,
    /// Public, with the anon and user tiers granted by default.
    pub public: Project,
    /// Private, with the same default grants as `public`.
    pub private1: Project,
    /// Private, with no default grants.
    pub private2: Project,
}

pub const MEMBER_ROLE_PERMISSIONS: &[&str] =
    &["view_project", "view_uss", "add_us", "modify_us", "delete_us"];

pub fn anon_ids() -> Vec<&'static str> {
    ANON_PERMISSIONS.iter().map(|(id, _)| *id).collect()
}

pub fn user_ids() -> Vec<&'static str> {
    USER_PERMISSIONS.iter().map(|(id, _)| *id).collect()
}

pub fn authorizer(store: Arc<InMemoryMembershipStore>) -> Authorizer {
    Authorizer::new(
        store,
        Arc::new(PermissionCatalog::builtin()),
        Arc::new(PolicyRegistry::reference()),
    )
}

pub async fn fixture() -> Fixture {
    let owner_id = UserId::new();
    let member_id = UserId::new();

    let public = Project::new(owner_id)
        .with_anon_permissions(anon_ids())
        .with_public_permissions(user_ids());
    let private1 = Project::new(owner_id)
        .private(true)
        .with_anon_permissions(anon_ids())
        .with_public_permissions(user_ids());
    let private2 = Project::new(owner_id).private(true);

    let store = Arc::new(InMemoryMembershipStore::new());
    for project in [&public, &private1, &private2] {
        store
            .add_membership(Membership::new(
                member_id,
                Role::new(project.id, "developer", MEMBER_ROLE_PERMISSIONS.iter().copied()),
            ))
            .await
            .expect("add member");
        store
            .add_membership(
                Membership::new(
                    owner_id,
                    Role::new(project.id, "product owner", MEMBER_ROLE_PERMISSIONS.iter().copied())
                        .with_order(1),
                )
                .owner(true),
            )
            .await
            .expect("add owner");
    }

    Fixture {
        authz: authorizer(store.clone()),
        store,
        owner: Subject::user(owner_id),
        member: Subject::user(member_id),
        registered: Subject::user(UserId::new()),
        public,
        private1,
        private2,
    }
}

impl Fixture {
    /// Decisions for `[anonymous, registered, member, owner]`.
    pub async fn matrix(&self, resource: &dyn Resolvable, action: &str) -> [bool; 4] {
        let subjects = [Subject::Anonymous, self.registered, self.member, self.owner];
        let mut out = [false; 4];
        for (slot, subject) in out.iter_mut().zip(subjects.iter()) {
            *slot = self
                .authz
                .authorize(subject, resource, action)
                .await
                .expect("decision")
                .is_allowed();
        }
        out
    }
}
