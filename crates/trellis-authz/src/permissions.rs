//! Effective permission set resolution.
//!
//! # Purpose and responsibility
//! Merges the four permission sources (anonymous defaults, public defaults,
//! role grants, owner tier) into the set of permission ids a subject holds on
//! one project.
//!
//! # Where it fits
//! Predicates call [`effective_permissions`] through the evaluation context
//! using the membership the gate already fetched. [`PermissionResolver`] is
//! the standalone form that performs its own lookup.
//!
//! # Key invariants and assumptions
//! - Privacy wins: a stranger (no membership, not owner-like) on a private
//!   project gets the empty set, even if the project grants anon/public ids.
//! - `Project::owner` and `Membership::is_owner` are each sufficient for the
//!   owner tier.
//! - Superusers are not special-cased here; the gate bypasses them.
//! - The result is an unordered set.
use crate::membership::MembershipResolver;
use crate::{AuthzResult, Membership, PermissionCatalog, Project, Subject};
use std::collections::HashSet;
use std::sync::Arc;

/// Compute the permission ids `subject` holds on `project`.
///
/// # What it does
/// Starts from the project's anonymous grants, adds public grants for
/// authenticated subjects, role grants for members, and the owner tier for
/// owners, then applies the private-project override for strangers.
///
/// # Invariants
/// - `membership`, when present, must belong to `subject` and `project`.
///
/// # Example
/// ```rust
/// use trellis_authz::{effective_permissions, PermissionCatalog, Project, Subject};
/// use trellis_common::ids::UserId;
///
/// let catalog = PermissionCatalog::builtin();
/// let project = Project::new(UserId::new())
///     .private(true)
///     .with_anon_permissions(["view_project"]);
/// let stranger = Subject::user(UserId::new());
/// assert!(effective_permissions(&catalog, &stranger, &project, None).is_empty());
/// ```
pub fn effective_permissions(
    catalog: &PermissionCatalog,
    subject: &Subject,
    project: &Project,
    membership: Option<&Membership>,
) -> HashSet<String> {
    let is_project_owner = subject
        .user_id()
        .is_some_and(|user_id| project.is_owned_by(user_id));
    let is_owner_like = is_project_owner || membership.is_some_and(|m| m.is_owner);

    // Strangers on a private project see nothing, regardless of anon/public grants.
    if membership.is_none() && !is_owner_like && project.is_private {
        return HashSet::new();
    }

    let mut permissions: HashSet<String> = project.anon_permissions.iter().cloned().collect();
    if subject.is_authenticated() {
        permissions.extend(project.public_permissions.iter().cloned());
    }
    if let Some(membership) = membership {
        permissions.extend(membership.role.permissions.iter().cloned());
    }
    if is_owner_like {
        permissions.extend(catalog.owner_tier_ids().iter().cloned());
    }
    permissions
}

/// Resolves effective permissions by looking up the membership first.
#[derive(Clone)]
pub struct PermissionResolver {
    memberships: MembershipResolver,
    catalog: Arc<PermissionCatalog>,
}

impl PermissionResolver {
    pub fn new(memberships: MembershipResolver, catalog: Arc<PermissionCatalog>) -> Self {
        Self {
            memberships,
            catalog,
        }
    }

    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    pub fn memberships(&self) -> &MembershipResolver {
        &self.memberships
    }

    /// Effective permission set for `subject` on `project`.
    ///
    /// # Errors
    /// - [`crate::AuthzError::Store`] when the membership lookup fails.
    pub async fn permissions_for(
        &self,
        subject: &Subject,
        project: &Project,
    ) -> AuthzResult<HashSet<String>> {
        let membership = self.memberships.resolve(subject, project).await?;
        Ok(effective_permissions(
            &self.catalog,
            subject,
            project,
            membership.as_ref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use trellis_common::ids::UserId;

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn open_private_project(owner: UserId) -> Project {
        Project::new(owner)
            .private(true)
            .with_anon_permissions(["view_project"])
            .with_public_permissions(["view_project", "add_issue"])
    }

    #[test]
    fn anonymous_gets_anon_permissions_on_public_project() {
        let catalog = PermissionCatalog::builtin();
        let project = Project::new(UserId::new())
            .with_anon_permissions(["view_project"])
            .with_public_permissions(["add_issue"]);
        let perms = effective_permissions(&catalog, &Subject::Anonymous, &project, None);
        assert_eq!(perms, set(&["view_project"]));
    }

    #[test]
    fn registered_user_adds_public_permissions() {
        let catalog = PermissionCatalog::builtin();
        let project = Project::new(UserId::new())
            .with_anon_permissions(["view_project"])
            .with_public_permissions(["add_issue"]);
        let perms =
            effective_permissions(&catalog, &Subject::user(UserId::new()), &project, None);
        assert_eq!(perms, set(&["view_project", "add_issue"]));
    }

    #[test]
    fn public_permissions_do_not_assume_anon_subset() {
        let catalog = PermissionCatalog::builtin();
        let project = Project::new(UserId::new())
            .with_anon_permissions(["view_wiki_pages"])
            .with_public_permissions(["add_issue"]);
        let perms =
            effective_permissions(&catalog, &Subject::user(UserId::new()), &project, None);
        assert!(perms.contains("view_wiki_pages"));
        assert!(perms.contains("add_issue"));
    }

    #[test]
    fn private_project_hides_everything_from_strangers() {
        let catalog = PermissionCatalog::builtin();
        let project = open_private_project(UserId::new());
        assert!(effective_permissions(&catalog, &Subject::Anonymous, &project, None).is_empty());
        assert!(
            effective_permissions(&catalog, &Subject::user(UserId::new()), &project, None)
                .is_empty()
        );
    }

    #[test]
    fn member_gets_role_plus_defaults_on_private_project() {
        let catalog = PermissionCatalog::builtin();
        let project = open_private_project(UserId::new());
        let user = UserId::new();
        let membership = Membership::new(user, Role::new(project.id, "dev", ["modify_us"]));
        let perms =
            effective_permissions(&catalog, &Subject::user(user), &project, Some(&membership));
        assert_eq!(perms, set(&["view_project", "add_issue", "modify_us"]));
    }

    #[test]
    fn member_with_empty_role_on_closed_private_project_gets_nothing() {
        let catalog = PermissionCatalog::builtin();
        let project = Project::new(UserId::new()).private(true);
        let user = UserId::new();
        let membership = Membership::new(user, Role::new(project.id, "guest", Vec::<String>::new()));
        let perms =
            effective_permissions(&catalog, &Subject::user(user), &project, Some(&membership));
        assert!(perms.is_empty());
    }

    #[test]
    fn owner_is_superset_of_all_sources() {
        let catalog = PermissionCatalog::builtin();
        let owner = UserId::new();
        for project in [
            open_private_project(owner),
            open_private_project(owner).private(false),
            Project::new(owner).private(true),
        ] {
            let perms = effective_permissions(&catalog, &Subject::user(owner), &project, None);
            assert!(perms.is_superset(&project.anon_permissions.iter().cloned().collect()));
            assert!(perms.is_superset(&project.public_permissions.iter().cloned().collect()));
            assert!(perms.is_superset(catalog.owner_tier_ids()));
        }
    }

    #[test]
    fn owner_flagged_member_gets_owner_tier() {
        let catalog = PermissionCatalog::builtin();
        let project = Project::new(UserId::new()).private(true);
        let user = UserId::new();
        let membership =
            Membership::new(user, Role::new(project.id, "co-owner", Vec::<String>::new()))
                .owner(true);
        let perms =
            effective_permissions(&catalog, &Subject::user(user), &project, Some(&membership));
        assert!(perms.contains("delete_project"));
        assert!(perms.is_superset(catalog.owner_tier_ids()));
    }

    #[test]
    fn project_owner_without_owner_flag_keeps_owner_tier() {
        let catalog = PermissionCatalog::builtin();
        let owner = UserId::new();
        let project = Project::new(owner).private(true);
        let membership = Membership::new(owner, Role::new(project.id, "dev", ["modify_us"]));
        let perms =
            effective_permissions(&catalog, &Subject::user(owner), &project, Some(&membership));
        assert!(perms.contains("modify_us"));
        assert!(perms.contains("modify_roles"));
    }

    #[test]
    fn superuser_gets_no_extra_permissions_from_the_resolver() {
        let catalog = PermissionCatalog::builtin();
        let project = open_private_project(UserId::new());
        let perms =
            effective_permissions(&catalog, &Subject::superuser(UserId::new()), &project, None);
        assert!(perms.is_empty());
    }
}
