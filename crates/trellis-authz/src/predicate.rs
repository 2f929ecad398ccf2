//! Composable permission predicates.
//!
//! # Purpose
//! A [`Predicate`] is a boolean rule evaluated against an [`AuthzContext`].
//! Primitive checks (authentication, ownership, project permission) are
//! combined into trees with [`Predicate::and`], [`Predicate::or`] and
//! [`Predicate::not`].
//!
//! # How it fits
//! Policies bind one predicate per `(resource type, action)`. The gate
//! prefetches the membership once, builds the context, then evaluates the
//! bound tree synchronously.
//!
//! # Key invariants
//! - Evaluation is pure; predicates can be shared across threads.
//! - `And` short-circuits on the first `false`, `Or` on the first `true`.
//! - `And([])` is `true`, `Or([])` is `false`.
//! - Missing data (no project, anonymous subject) makes a check `false`; it
//!   never raises.
//!
//! # Examples
//! ```rust
//! use trellis_authz::Predicate;
//!
//! let retrieve = Predicate::or([
//!     Predicate::has_project_perm("view_project"),
//!     Predicate::IsProjectOwner,
//! ]);
//! assert!(retrieve.requires_membership());
//! assert!(!Predicate::AllowAny.requires_membership());
//! ```
use crate::permissions::effective_permissions;
use crate::{Membership, PermissionCatalog, Project, Resolvable, Subject};
use std::cell::OnceCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Everything a predicate may look at during one evaluation.
pub struct AuthzContext<'a> {
    subject: &'a Subject,
    resource: &'a dyn Resolvable,
    action: &'a str,
    membership: Option<&'a Membership>,
    catalog: &'a PermissionCatalog,
    permissions: OnceCell<HashSet<String>>,
}

impl<'a> AuthzContext<'a> {
    pub fn new(
        subject: &'a Subject,
        resource: &'a dyn Resolvable,
        action: &'a str,
        membership: Option<&'a Membership>,
        catalog: &'a PermissionCatalog,
    ) -> Self {
        Self {
            subject,
            resource,
            action,
            membership,
            catalog,
            permissions: OnceCell::new(),
        }
    }

    pub fn subject(&self) -> &Subject {
        self.subject
    }

    pub fn resource(&self) -> &dyn Resolvable {
        self.resource
    }

    pub fn action(&self) -> &str {
        self.action
    }

    pub fn project(&self) -> Option<&Project> {
        self.resource.project()
    }

    pub fn membership(&self) -> Option<&Membership> {
        self.membership
    }

    /// Effective permission set on the target project, computed at most once
    /// per context. `None` when the target has no project.
    pub fn effective_permissions(&self) -> Option<&HashSet<String>> {
        let project = self.project()?;
        Some(self.permissions.get_or_init(|| {
            effective_permissions(self.catalog, self.subject, project, self.membership)
        }))
    }
}

/// A user-supplied leaf check.
pub trait Check: fmt::Debug + Send + Sync {
    fn check(&self, ctx: &AuthzContext<'_>) -> bool;

    /// Whether the check reads the subject's membership, directly or through
    /// [`AuthzContext::effective_permissions`]. Defaults to `true`; checks that
    /// only look at the subject or project can return `false` to let the gate
    /// skip the store lookup.
    fn requires_membership(&self) -> bool {
        true
    }
}

#[derive(Clone)]
pub enum Predicate {
    AllowAny,
    IsAuthenticated,
    IsAnonymous,
    /// The subject is `Project::owner` of the target's project.
    IsProjectOwner,
    /// The subject has a membership in the target's project.
    IsProjectMember,
    HasProjectPerm(String),
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Custom(Arc<dyn Check>),
}

impl Predicate {
    pub fn has_project_perm(permission: impl Into<String>) -> Self {
        Predicate::HasProjectPerm(permission.into())
    }

    pub fn deny_all() -> Self {
        Predicate::not(Predicate::AllowAny)
    }

    pub fn not(predicate: Predicate) -> Self {
        Predicate::Not(Box::new(predicate))
    }

    pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And(predicates.into_iter().collect())
    }

    pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or(predicates.into_iter().collect())
    }

    pub fn custom(check: impl Check + 'static) -> Self {
        Predicate::Custom(Arc::new(check))
    }

    pub fn evaluate(&self, ctx: &AuthzContext<'_>) -> bool {
        match self {
            Predicate::AllowAny => true,
            Predicate::IsAuthenticated => ctx.subject().is_authenticated(),
            Predicate::IsAnonymous => !ctx.subject().is_authenticated(),
            Predicate::IsProjectOwner => match (ctx.subject().user_id(), ctx.project()) {
                (Some(user_id), Some(project)) => project.is_owned_by(user_id),
                _ => false,
            },
            Predicate::IsProjectMember => ctx.project().is_some() && ctx.membership().is_some(),
            Predicate::HasProjectPerm(permission) => ctx
                .effective_permissions()
                .is_some_and(|permissions| permissions.contains(permission)),
            Predicate::Not(inner) => !inner.evaluate(ctx),
            Predicate::And(predicates) => predicates.iter().all(|p| p.evaluate(ctx)),
            Predicate::Or(predicates) => predicates.iter().any(|p| p.evaluate(ctx)),
            Predicate::Custom(check) => check.check(ctx),
        }
    }

    /// Whether evaluating this tree may need the subject's membership, so the
    /// gate can skip the store lookup for trees that never read it.
    pub fn requires_membership(&self) -> bool {
        match self {
            Predicate::HasProjectPerm(_) | Predicate::IsProjectMember => true,
            Predicate::AllowAny
            | Predicate::IsAuthenticated
            | Predicate::IsAnonymous
            | Predicate::IsProjectOwner => false,
            Predicate::Not(inner) => inner.requires_membership(),
            Predicate::And(predicates) | Predicate::Or(predicates) => {
                predicates.iter().any(Predicate::requires_membership)
            }
            Predicate::Custom(check) => check.requires_membership(),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::AllowAny => f.write_str("AllowAny"),
            Predicate::IsAuthenticated => f.write_str("IsAuthenticated"),
            Predicate::IsAnonymous => f.write_str("IsAnonymous"),
            Predicate::IsProjectOwner => f.write_str("IsProjectOwner"),
            Predicate::IsProjectMember => f.write_str("IsProjectMember"),
            Predicate::HasProjectPerm(permission) => write!(f, "HasProjectPerm({permission:?})"),
            Predicate::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Predicate::And(predicates) => f.debug_tuple("And").field(predicates).finish(),
            Predicate::Or(predicates) => f.debug_tuple("Or").field(predicates).finish(),
            Predicate::Custom(check) => f.debug_tuple("Custom").field(check).finish(),
        }
    }
}
