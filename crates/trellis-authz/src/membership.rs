//! Membership resolution for a subject on a project.
//!
//! # Purpose
//! Finds the membership (joined with its role) linking a subject to a
//! project. Anonymous subjects never trigger a lookup.
//!
//! # Security considerations
//! - Store errors propagate; a failed lookup must never read as "not a member".
use crate::store::{MembershipStore, StoreResult};
use crate::{Membership, Project, Subject};
use std::sync::Arc;

#[derive(Clone)]
pub struct MembershipResolver {
    store: Arc<dyn MembershipStore>,
}

impl MembershipResolver {
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Resolve the subject's membership in `project`.
    ///
    /// Performs exactly one store lookup for authenticated subjects and none
    /// for anonymous ones.
    pub async fn resolve(
        &self,
        subject: &Subject,
        project: &Project,
    ) -> StoreResult<Option<Membership>> {
        let Some(user_id) = subject.user_id() else {
            return Ok(None);
        };
        let result = self.store.lookup_membership(user_id, project.id).await;
        match &result {
            Ok(found) => {
                let outcome = if found.is_some() { "member" } else { "none" };
                metrics::counter!("trellis_authz_membership_lookups_total", "outcome" => outcome)
                    .increment(1);
            }
            Err(err) => {
                metrics::counter!("trellis_authz_membership_lookups_total", "outcome" => "error")
                    .increment(1);
                tracing::warn!(
                    error = %err,
                    backend = self.store.backend_name(),
                    project_id = %project.id,
                    "membership lookup failed"
                );
            }
        }
        result
    }
}
