//! Membership store abstraction.
//!
//! # Purpose
//! The engine reads memberships from an external store it does not own. This
//! module defines that seam plus the in-memory and caching implementations.
//!
//! # Key invariants
//! - A lookup returns the membership joined with its role in one round trip.
//! - At most one membership exists per `(user, project)` pair.
//! - Store failures surface as [`StoreError`], never as "no membership".
use crate::Membership;
use async_trait::async_trait;
use thiserror::Error;
use trellis_common::ids::{ProjectId, UserId};

pub mod cached;
pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Fetch the membership (with its role) for `(user_id, project_id)`.
    async fn lookup_membership(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> StoreResult<Option<Membership>>;

    fn backend_name(&self) -> &'static str;
}
