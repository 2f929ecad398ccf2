//! Subjects and the project/role/membership records the engine reads.
//!
//! # Purpose
//! Defines the read-only snapshot the engine evaluates: who is asking
//! ([`Subject`]), what project is involved ([`Project`]), and how the subject
//! relates to it ([`Membership`] through a [`Role`]).
//!
//! # Key invariants
//! - A project has exactly one owner, fixed at creation.
//! - Role permissions are de-duplicated and keep their first-seen order.
//! - `anon_permissions ⊆ public_permissions` is not enforced here.
//!
//! # Common pitfalls
//! - Treating `Membership::is_owner` and `Project::owner` as the same thing;
//!   either one grants the owner tier.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use trellis_common::ids::{ProjectId, RoleId, UserId};

/// An authenticated user as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub is_superuser: bool,
}

/// The entity requesting an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Subject {
    Anonymous,
    User(User),
}

impl Subject {
    pub fn user(id: UserId) -> Self {
        Subject::User(User {
            id,
            is_superuser: false,
        })
    }

    pub fn superuser(id: UserId) -> Self {
        Subject::User(User {
            id,
            is_superuser: true,
        })
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Subject::Anonymous => None,
            Subject::User(user) => Some(user.id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Subject::User(_))
    }

    pub fn is_superuser(&self) -> bool {
        matches!(self, Subject::User(user) if user.is_superuser)
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Subject::Anonymous => "anonymous",
            Subject::User(user) if user.is_superuser => "superuser",
            Subject::User(_) => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub owner: UserId,
    pub is_private: bool,
    pub anon_permissions: BTreeSet<String>,
    pub public_permissions: BTreeSet<String>,
}

impl Project {
    /// A public project with no anonymous or public grants.
    pub fn new(owner: UserId) -> Self {
        Self {
            id: ProjectId::new(),
            owner,
            is_private: false,
            anon_permissions: BTreeSet::new(),
            public_permissions: BTreeSet::new(),
        }
    }

    pub fn private(mut self, is_private: bool) -> Self {
        self.is_private = is_private;
        self
    }

    pub fn with_anon_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.anon_permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_public_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public_permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub project_id: ProjectId,
    pub name: String,
    pub permissions: Vec<String>,
    /// Display position only.
    pub order: i32,
}

impl Role {
    pub fn new<I, S>(project_id: ProjectId, name: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: RoleId::new(),
            project_id,
            name: name.into(),
            permissions: dedup_in_order(permissions),
            order: 10,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn grants(&self, permission: &str) -> bool {
        self.permissions.iter().any(|granted| granted == permission)
    }
}

fn dedup_in_order<I, S>(permissions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    permissions
        .into_iter()
        .map(Into::into)
        .filter(|permission: &String| seen.insert(permission.clone()))
        .collect()
}

/// Links one user to one project through exactly one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub role: Role,
    pub is_owner: bool,
}

impl Membership {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            project_id: role.project_id,
            role,
            is_owner: false,
        }
    }

    pub fn owner(mut self, is_owner: bool) -> Self {
        self.is_owner = is_owner;
        self
    }
}
