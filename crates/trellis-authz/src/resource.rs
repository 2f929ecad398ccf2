//! Authorization targets and project resolution.
//!
//! # Purpose
//! Anything passed to the gate implements [`Resolvable`]: it names its
//! resource type (used to pick a policy) and, when it has one, the project it
//! belongs to.
//!
//! # Key invariants
//! - A [`Project`] resolves to itself.
//! - Collection-scoped targets (list/create without an object) may have no
//!   project; predicates that need one evaluate to `false`.
use crate::Project;
use std::borrow::Borrow;
use std::fmt;

pub const RESOURCE_PROJECT: &str = "project";
pub const RESOURCE_ROLE: &str = "role";
pub const RESOURCE_POINTS: &str = "points";
pub const RESOURCE_USERSTORY: &str = "userstory";

/// Resource type name used as the first half of a policy key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceType(String);

impl ResourceType {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ResourceType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// An authorization target: a project, or something that may belong to one.
pub trait Resolvable: Send + Sync {
    fn resource_type(&self) -> &str;

    fn project(&self) -> Option<&Project>;
}

impl Resolvable for Project {
    fn resource_type(&self) -> &str {
        RESOURCE_PROJECT
    }

    fn project(&self) -> Option<&Project> {
        Some(self)
    }
}

/// Resolve the project an authorization target belongs to.
pub fn project_of(resource: &dyn Resolvable) -> Option<&Project> {
    resource.project()
}

/// A project-owned record (story, task, role, ...) viewed only through its
/// type and parent project.
#[derive(Debug, Clone, Copy)]
pub struct ProjectObject<'a> {
    resource_type: &'a str,
    project: Option<&'a Project>,
}

impl<'a> ProjectObject<'a> {
    pub fn new(resource_type: &'a str, project: &'a Project) -> Self {
        Self {
            resource_type,
            project: Some(project),
        }
    }

    /// A record whose parent project could not be loaded.
    pub fn detached(resource_type: &'a str) -> Self {
        Self {
            resource_type,
            project: None,
        }
    }
}

impl Resolvable for ProjectObject<'_> {
    fn resource_type(&self) -> &str {
        self.resource_type
    }

    fn project(&self) -> Option<&Project> {
        self.project
    }
}

/// Target for collection actions such as `list` or `create` on projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    resource_type: ResourceType,
}

impl Collection {
    pub fn new(resource_type: impl Into<ResourceType>) -> Self {
        Self {
            resource_type: resource_type.into(),
        }
    }
}

impl Resolvable for Collection {
    fn resource_type(&self) -> &str {
        self.resource_type.as_str()
    }

    fn project(&self) -> Option<&Project> {
        None
    }
}
