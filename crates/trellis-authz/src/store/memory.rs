//! In-memory membership store.
//!
//! # Purpose
//! Implements [`MembershipStore`] with a `HashMap` keyed by `(user, project)`
//! guarded by `tokio::sync::RwLock`. Used by tests, demos, and deployments
//! that load memberships from elsewhere at startup.
//!
//! # Consistency
//! - Not durable; state is lost on restart.
//! - Reads run concurrently, writes are serialized.
use super::{MembershipStore, StoreError, StoreResult};
use crate::{Membership, Role};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use trellis_common::ids::{ProjectId, UserId};

type MembershipKey = (UserId, ProjectId);

#[derive(Debug, Clone, Default)]
pub struct InMemoryMembershipStore {
    memberships: Arc<RwLock<HashMap<MembershipKey, Membership>>>,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a membership; a second membership for the same pair is a conflict.
    pub async fn add_membership(&self, membership: Membership) -> StoreResult<Membership> {
        let mut memberships = self.memberships.write().await;
        let key = (membership.user_id, membership.project_id);
        if memberships.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "user {} is already a member of project {}",
                key.0, key.1
            )));
        }
        memberships.insert(key, membership.clone());
        Ok(membership)
    }

    pub async fn update_role(
        &self,
        user_id: UserId,
        project_id: ProjectId,
        role: Role,
    ) -> StoreResult<Membership> {
        if role.project_id != project_id {
            return Err(StoreError::Conflict(format!(
                "role {} belongs to project {}",
                role.id, role.project_id
            )));
        }
        let mut memberships = self.memberships.write().await;
        let membership = memberships
            .get_mut(&(user_id, project_id))
            .ok_or_else(|| not_found(user_id, project_id))?;
        membership.role = role;
        Ok(membership.clone())
    }

    pub async fn set_owner_flag(
        &self,
        user_id: UserId,
        project_id: ProjectId,
        is_owner: bool,
    ) -> StoreResult<Membership> {
        let mut memberships = self.memberships.write().await;
        let membership = memberships
            .get_mut(&(user_id, project_id))
            .ok_or_else(|| not_found(user_id, project_id))?;
        membership.is_owner = is_owner;
        Ok(membership.clone())
    }

    pub async fn remove_membership(&self, user_id: UserId, project_id: ProjectId) -> StoreResult<()> {
        self.memberships
            .write()
            .await
            .remove(&(user_id, project_id))
            .map(|_| ())
            .ok_or_else(|| not_found(user_id, project_id))
    }

    /// Members of a project, ordered by role display order.
    pub async fn list_project_members(&self, project_id: ProjectId) -> Vec<Membership> {
        let mut members: Vec<Membership> = self
            .memberships
            .read()
            .await
            .values()
            .filter(|membership| membership.project_id == project_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| {
            a.role
                .order
                .cmp(&b.role.order)
                .then_with(|| a.role.name.cmp(&b.role.name))
        });
        members
    }
}

fn not_found(user_id: UserId, project_id: ProjectId) -> StoreError {
    StoreError::NotFound(format!("membership for user {user_id} in project {project_id}"))
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn lookup_membership(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> StoreResult<Option<Membership>> {
        Ok(self
            .memberships
            .read()
            .await
            .get(&(user_id, project_id))
            .cloned())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
