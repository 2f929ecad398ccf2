//! Resource permission policies.
//!
//! # Purpose
//! Binds each `(resource type, action)` pair to a [`Predicate`]. Policies are
//! assembled once at startup into a [`PolicyRegistry`] and only read after
//! that.
//!
//! # Key invariants
//! - An unbound pair has no predicate; the gate turns that into a deny.
//! - A policy's "enough" predicate is OR'd in front of every bound action.
//! - Binding several predicates to one action requires all of them.
//!
//! # Examples
//! ```rust
//! use trellis_authz::{PolicyRegistry, Predicate, ResourcePolicy, ACTION_RETRIEVE};
//!
//! let mut registry = PolicyRegistry::new();
//! registry.register(
//!     ResourcePolicy::new("wiki_page")
//!         .bind(ACTION_RETRIEVE, Predicate::has_project_perm("view_wiki_pages")),
//! );
//! assert!(registry.lookup("wiki_page", ACTION_RETRIEVE).is_some());
//! assert!(registry.lookup("wiki_page", "destroy").is_none());
//! ```
use crate::resource::{RESOURCE_POINTS, RESOURCE_PROJECT, RESOURCE_ROLE, RESOURCE_USERSTORY};
use crate::{Predicate, ResourceType};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

pub const ACTION_RETRIEVE: &str = "retrieve";
pub const ACTION_CREATE: &str = "create";
pub const ACTION_UPDATE: &str = "update";
pub const ACTION_DESTROY: &str = "destroy";
pub const ACTION_LIST: &str = "list";
pub const ACTION_STATS: &str = "stats";
pub const ACTION_STAR: &str = "star";
pub const ACTION_UNSTAR: &str = "unstar";
pub const ACTION_ISSUES_STATS: &str = "issues_stats";
pub const ACTION_ISSUES_FILTERS_DATA: &str = "issues_filters_data";
pub const ACTION_TAGS: &str = "tags";

/// Action bindings for one resource type.
#[derive(Debug, Clone)]
pub struct ResourcePolicy {
    resource_type: ResourceType,
    enough: Option<Predicate>,
    actions: BTreeMap<String, Predicate>,
}

impl ResourcePolicy {
    pub fn new(resource_type: impl Into<ResourceType>) -> Self {
        Self {
            resource_type: resource_type.into(),
            enough: None,
            actions: BTreeMap::new(),
        }
    }

    /// Predicate that, when true, allows every bound action on its own.
    pub fn with_enough(mut self, predicate: Predicate) -> Self {
        self.enough = Some(predicate);
        self
    }

    /// Bind `action` to `predicate`, replacing any previous binding.
    pub fn bind(mut self, action: impl Into<String>, predicate: Predicate) -> Self {
        self.actions.insert(action.into(), predicate);
        self
    }

    /// Bind `action` to the conjunction of `predicates`.
    pub fn bind_all(
        self,
        action: impl Into<String>,
        predicates: impl IntoIterator<Item = Predicate>,
    ) -> Self {
        self.bind(action, Predicate::and(predicates))
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    /// The predicate guarding `action`, with the policy's enough-predicate
    /// folded in. `None` when the action is unbound.
    pub fn predicate_for(&self, action: &str) -> Option<Cow<'_, Predicate>> {
        let bound = self.actions.get(action)?;
        Some(match &self.enough {
            Some(enough) => Cow::Owned(Predicate::or([enough.clone(), bound.clone()])),
            None => Cow::Borrowed(bound),
        })
    }
}

/// All resource policies, keyed by resource type.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: HashMap<ResourceType, ResourcePolicy>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a policy, replacing any policy already registered for its type.
    pub fn register(&mut self, policy: ResourcePolicy) -> &mut Self {
        self.policies.insert(policy.resource_type.clone(), policy);
        self
    }

    pub fn with(mut self, policy: ResourcePolicy) -> Self {
        self.register(policy);
        self
    }

    pub fn policy(&self, resource_type: &str) -> Option<&ResourcePolicy> {
        self.policies.get(resource_type)
    }

    pub fn lookup(&self, resource_type: &str, action: &str) -> Option<Cow<'_, Predicate>> {
        self.policy(resource_type)?.predicate_for(action)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.policies.keys()
    }

    /// The project, role, points and user story policies.
    pub fn reference() -> Self {
        Self::new()
            .with(project_policy())
            .with(project_child_policy(RESOURCE_ROLE))
            .with(project_child_policy(RESOURCE_POINTS))
            .with(userstory_policy())
    }
}

pub fn project_policy() -> ResourcePolicy {
    ResourcePolicy::new(RESOURCE_PROJECT)
        .bind(ACTION_RETRIEVE, Predicate::has_project_perm("view_project"))
        .bind(ACTION_CREATE, Predicate::IsAuthenticated)
        .bind(ACTION_UPDATE, Predicate::IsProjectOwner)
        .bind(ACTION_DESTROY, Predicate::IsProjectOwner)
        .bind(ACTION_LIST, Predicate::AllowAny)
        .bind(ACTION_STATS, Predicate::AllowAny)
        .bind(ACTION_STAR, Predicate::IsAuthenticated)
        .bind(ACTION_UNSTAR, Predicate::IsAuthenticated)
        .bind(ACTION_ISSUES_STATS, Predicate::AllowAny)
        .bind(ACTION_ISSUES_FILTERS_DATA, Predicate::AllowAny)
        .bind(ACTION_TAGS, Predicate::AllowAny)
}

/// Project configuration records (roles, points) readable by anyone who can
/// see the project and editable only by its owner.
pub fn project_child_policy(resource_type: &str) -> ResourcePolicy {
    ResourcePolicy::new(resource_type)
        .bind(ACTION_RETRIEVE, Predicate::has_project_perm("view_project"))
        .bind(ACTION_CREATE, Predicate::IsProjectOwner)
        .bind(ACTION_UPDATE, Predicate::IsProjectOwner)
        .bind(ACTION_DESTROY, Predicate::IsProjectOwner)
        .bind(ACTION_LIST, Predicate::AllowAny)
}

pub fn userstory_policy() -> ResourcePolicy {
    ResourcePolicy::new(RESOURCE_USERSTORY)
        .bind(ACTION_RETRIEVE, Predicate::has_project_perm("view_uss"))
        .bind(
            ACTION_CREATE,
            Predicate::or([
                Predicate::has_project_perm("add_us"),
                Predicate::has_project_perm("add_us_to_project"),
            ]),
        )
        .bind(ACTION_UPDATE, Predicate::has_project_perm("modify_us"))
        .bind(ACTION_DESTROY, Predicate::has_project_perm("delete_us"))
        .bind(ACTION_LIST, Predicate::AllowAny)
}
