//! Permission catalog: the four visibility tiers of project permissions.
//!
//! # Purpose
//! Holds every permission identifier the engine knows about, partitioned into
//! the anonymous, user (public), member, and owner tiers.
//!
//! # How it fits
//! Projects draw `anon_permissions`/`public_permissions` from the first two
//! tiers, roles draw from the member tier, and owners receive the owner tier
//! implicitly. The effective permission resolver only needs the owner tier
//! and the universal set; the rest is used for validation.
//!
//! # Key invariants
//! - Tiers are disjoint; an id belongs to exactly one tier.
//! - The catalog is built once at startup and never mutated afterwards.
//!
//! # Examples
//! ```rust
//! use trellis_authz::{PermissionCatalog, Tier};
//!
//! let catalog = PermissionCatalog::builtin();
//! assert_eq!(catalog.tier_of("delete_project"), Some(Tier::Owner));
//! assert!(catalog.owner_tier_ids().contains("modify_roles"));
//! ```
//!
//! # Common pitfalls
//! - Granting owner-tier ids through a role; use
//!   [`PermissionCatalog::validate_role_permissions`] before persisting roles.
use crate::{AuthzError, AuthzResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const ANON_PERMISSIONS: &[(&str, &str)] = &[
    ("view_project", "View project"),
    ("view_milestones", "View milestones"),
    ("view_uss", "View user stories"),
    ("view_tasks", "View tasks"),
    ("view_issues", "View issues"),
    ("view_wiki_pages", "View wiki pages"),
];

pub const USER_PERMISSIONS: &[(&str, &str)] = &[
    ("ask_to_be_member", "Ask to be a member"),
    ("create_project", "Create project"),
    ("follow_public_project", "Follow public project"),
    ("star_public_project", "Star public project"),
    ("add_us_to_project", "Add user story to project"),
    ("add_comments_to_us", "Add comments to user stories"),
    ("add_comments_to_task", "Add comments to tasks"),
    ("add_issue", "Add issues"),
    ("add_comments_issue", "Add comments to issues"),
    ("add_wiki_page", "Add wiki page"),
    ("modify_wiki_page", "Modify wiki page"),
];

pub const MEMBER_PERMISSIONS: &[(&str, &str)] = &[
    ("add_milestone", "Add milestone"),
    ("modify_milestone", "Modify milestone"),
    ("delete_milestone", "Delete milestone"),
    ("add_us", "Add user story"),
    ("modify_us", "Modify user story"),
    ("delete_us", "Delete user story"),
    ("add_task", "Add task"),
    ("modify_task", "Modify task"),
    ("delete_task", "Delete task"),
    ("modify_issue", "Modify issue"),
    ("delete_issue", "Delete issue"),
    ("vote_issues", "Vote issues"),
    ("delete_wiki_page", "Delete wiki page"),
    ("add_wiki_link", "Add wiki link"),
    ("modify_wiki_link", "Modify wiki link"),
    ("delete_wiki_link", "Delete wiki link"),
];

pub const OWNER_PERMISSIONS: &[(&str, &str)] = &[
    ("modify_project", "Modify project"),
    ("add_member", "Add member"),
    ("remove_member", "Remove member"),
    ("modify_project_values", "Modify project values"),
    ("delete_project", "Delete project"),
    ("modify_roles", "Modify roles"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Anon,
    User,
    Member,
    Owner,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Anon, Tier::User, Tier::Member, Tier::Owner];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Anon => "anon",
            Tier::User => "user",
            Tier::Member => "member",
            Tier::Owner => "owner",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(permission_id, human_label)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub label: String,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// On-disk shape of a catalog file.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    anon: Vec<CatalogEntry>,
    #[serde(default)]
    user: Vec<CatalogEntry>,
    #[serde(default)]
    member: Vec<CatalogEntry>,
    #[serde(default)]
    owner: Vec<CatalogEntry>,
}

/// Immutable registry of permission ids grouped by tier.
///
/// # Invariants
/// - Every id appears in exactly one tier.
/// - Entry order within a tier is preserved from construction.
#[derive(Debug, Clone)]
pub struct PermissionCatalog {
    anon: Vec<CatalogEntry>,
    user: Vec<CatalogEntry>,
    member: Vec<CatalogEntry>,
    owner: Vec<CatalogEntry>,
    owner_ids: HashSet<String>,
    index: HashMap<String, Tier>,
}

impl PermissionCatalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Self {
        let entries = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(id, label)| CatalogEntry::new(*id, *label))
                .collect::<Vec<_>>()
        };
        Self::assemble(
            entries(ANON_PERMISSIONS),
            entries(USER_PERMISSIONS),
            entries(MEMBER_PERMISSIONS),
            entries(OWNER_PERMISSIONS),
        )
    }

    /// Build a catalog from explicit tiers.
    ///
    /// # Errors
    /// - [`AuthzError::InvalidCatalog`] if an id is empty or appears twice.
    pub fn from_tiers(
        anon: Vec<CatalogEntry>,
        user: Vec<CatalogEntry>,
        member: Vec<CatalogEntry>,
        owner: Vec<CatalogEntry>,
    ) -> AuthzResult<Self> {
        let mut seen: HashMap<&str, Tier> = HashMap::new();
        for (tier, entries) in [
            (Tier::Anon, &anon),
            (Tier::User, &user),
            (Tier::Member, &member),
            (Tier::Owner, &owner),
        ] {
            for entry in entries {
                if entry.id.trim().is_empty() {
                    return Err(AuthzError::InvalidCatalog(format!(
                        "empty permission id in {tier} tier"
                    )));
                }
                if let Some(previous) = seen.insert(entry.id.as_str(), tier) {
                    return Err(AuthzError::InvalidCatalog(format!(
                        "{} listed in both {previous} and {tier} tiers",
                        entry.id
                    )));
                }
            }
        }
        Ok(Self::assemble(anon, user, member, owner))
    }

    /// Parse a catalog from YAML with `anon`, `user`, `member` and `owner`
    /// lists of `{id, label}` entries.
    pub fn from_yaml_str(contents: &str) -> AuthzResult<Self> {
        let file: CatalogFile = serde_yaml::from_str(contents)?;
        Self::from_tiers(file.anon, file.user, file.member, file.owner)
    }

    fn assemble(
        anon: Vec<CatalogEntry>,
        user: Vec<CatalogEntry>,
        member: Vec<CatalogEntry>,
        owner: Vec<CatalogEntry>,
    ) -> Self {
        let owner_ids = owner.iter().map(|entry| entry.id.clone()).collect();
        let mut index = HashMap::new();
        for (tier, entries) in [
            (Tier::Anon, &anon),
            (Tier::User, &user),
            (Tier::Member, &member),
            (Tier::Owner, &owner),
        ] {
            for entry in entries {
                index.insert(entry.id.clone(), tier);
            }
        }
        Self {
            anon,
            user,
            member,
            owner,
            owner_ids,
            index,
        }
    }

    pub fn tier(&self, tier: Tier) -> &[CatalogEntry] {
        match tier {
            Tier::Anon => &self.anon,
            Tier::User => &self.user,
            Tier::Member => &self.member,
            Tier::Owner => &self.owner,
        }
    }

    pub fn ids(&self, tier: Tier) -> impl Iterator<Item = &str> {
        self.tier(tier).iter().map(|entry| entry.id.as_str())
    }

    /// Ids implicitly granted to project owners and owner-flagged members.
    pub fn owner_tier_ids(&self) -> &HashSet<String> {
        &self.owner_ids
    }

    /// Every id in the catalog, regardless of tier.
    pub fn all_ids(&self) -> HashSet<String> {
        self.index.keys().cloned().collect()
    }

    pub fn tier_of(&self, id: &str) -> Option<Tier> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn label(&self, id: &str) -> Option<&str> {
        let tier = self.tier_of(id)?;
        self.tier(tier)
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.label.as_str())
    }

    /// Check that a role's permission list only uses grantable ids.
    ///
    /// # Errors
    /// - [`AuthzError::UnknownPermission`] for ids missing from the catalog.
    /// - [`AuthzError::OwnerPermissionInRole`] for owner-tier ids.
    pub fn validate_role_permissions<S: AsRef<str>>(&self, permissions: &[S]) -> AuthzResult<()> {
        for permission in permissions {
            let permission = permission.as_ref();
            match self.tier_of(permission) {
                None => return Err(AuthzError::UnknownPermission(permission.to_string())),
                Some(Tier::Owner) => {
                    return Err(AuthzError::OwnerPermissionInRole(permission.to_string()));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl Default for PermissionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
