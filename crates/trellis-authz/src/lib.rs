//! Project authorization engine.
//!
//! # Purpose
//! Decides whether a subject (anonymous, user, or superuser) may perform an
//! action on a project-scoped resource. Permissions come from a tiered
//! catalog (anon, user, member, owner); policies bind actions to composable
//! predicates over those permissions.
//!
//! # How it fits
//! API handlers build an [`Authorizer`] once at startup from a
//! [`store::MembershipStore`], a [`PermissionCatalog`] and a
//! [`PolicyRegistry`], then call [`Authorizer::authorize`] per request.
//! Membership persistence lives behind the store trait; the engine only reads.
//!
//! # Key invariants
//! - Private projects grant nothing to non-members, regardless of the
//!   project's anonymous/public permission lists.
//! - Owners (by creation or co-owner flag) receive the whole owner tier.
//! - Unbound `(resource type, action)` pairs are denied.
//! - Membership store failures surface as [`AuthzError::Store`], never as a
//!   deny.
//!
//! # Important configuration
//! - `TRELLIS_AUTHZ_CATALOG` points at a YAML catalog replacing the built-in one.
//! - `TRELLIS_AUTHZ_MEMBERSHIP_CACHE_TTL_MS` enables the membership cache.
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use trellis_authz::store::memory::InMemoryMembershipStore;
//! use trellis_authz::{ACTION_RETRIEVE, Authorizer, PermissionCatalog, PolicyRegistry, Project, Subject};
//! use trellis_common::ids::UserId;
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build().expect("runtime");
//! rt.block_on(async {
//!     let authz = Authorizer::new(
//!         Arc::new(InMemoryMembershipStore::new()),
//!         Arc::new(PermissionCatalog::builtin()),
//!         Arc::new(PolicyRegistry::reference()),
//!     );
//!     let project = Project::new(UserId::new()).with_anon_permissions(["view_project"]);
//!     let decision = authz
//!         .authorize(&Subject::Anonymous, &project, ACTION_RETRIEVE)
//!         .await
//!         .expect("decision");
//!     assert!(decision.is_allowed());
//! });
//! ```
//!
//! # Common pitfalls
//! - Superusers are only bypassed at the gate; [`effective_permissions`]
//!   reports what their memberships grant, not "everything".

mod catalog;
pub mod config;
mod errors;
mod gate;
mod membership;
pub mod observability;
mod permissions;
mod policy;
mod predicate;
mod resource;
pub mod store;
mod types;

pub use catalog::{
    ANON_PERMISSIONS, CatalogEntry, MEMBER_PERMISSIONS, OWNER_PERMISSIONS, PermissionCatalog,
    Tier, USER_PERMISSIONS,
};
pub use errors::{AuthzError, AuthzResult};
pub use gate::{Authorizer, Decision, DecisionReason, DenialKind};
pub use membership::MembershipResolver;
pub use permissions::{PermissionResolver, effective_permissions};
pub use policy::{
    ACTION_CREATE, ACTION_DESTROY, ACTION_ISSUES_FILTERS_DATA, ACTION_ISSUES_STATS, ACTION_LIST,
    ACTION_RETRIEVE, ACTION_STAR, ACTION_STATS, ACTION_TAGS, ACTION_UNSTAR, ACTION_UPDATE,
    PolicyRegistry, ResourcePolicy, project_child_policy, project_policy, userstory_policy,
};
pub use predicate::{AuthzContext, Check, Predicate};
pub use resource::{
    Collection, ProjectObject, RESOURCE_POINTS, RESOURCE_PROJECT, RESOURCE_ROLE,
    RESOURCE_USERSTORY, Resolvable, ResourceType, project_of,
};
pub use types::{Membership, Project, Role, Subject, User};
