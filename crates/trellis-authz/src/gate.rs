//! The authorization gate: the single entry point collaborators call.
//!
//! # Purpose and responsibility
//! Turns `(subject, resource, action)` into a [`Decision`]. Superusers are
//! allowed before any policy is consulted, unbound actions are denied, and
//! everything else is decided by the bound predicate.
//!
//! # Where it fits
//! API handlers call [`Authorizer::authorize`] and map a denial to 401 or 403
//! with [`Decision::denial_kind`].
//!
//! # Key invariants and assumptions
//! - Fail closed: no policy means deny.
//! - At most one membership lookup per call, and none for anonymous subjects,
//!   project-less targets, or predicates that never read membership.
//! - A store failure is returned as an error, never as a deny.
use crate::membership::MembershipResolver;
use crate::permissions::PermissionResolver;
use crate::store::MembershipStore;
use crate::{AuthzContext, AuthzResult, PermissionCatalog, PolicyRegistry, Project, Resolvable, Subject};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    SuperuserBypass,
    NoPolicy,
    PolicyEvaluated,
}

impl DecisionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionReason::SuperuserBypass => "superuser_bypass",
            DecisionReason::NoPolicy => "no_policy",
            DecisionReason::PolicyEvaluated => "policy_evaluated",
        }
    }
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an API layer should report a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// The subject is anonymous; authenticating may change the outcome.
    Unauthenticated,
    /// The subject is authenticated but not allowed.
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allow: bool,
    pub reason: DecisionReason,
}

impl Decision {
    pub fn allow(reason: DecisionReason) -> Self {
        Self {
            allow: true,
            reason,
        }
    }

    pub fn deny(reason: DecisionReason) -> Self {
        Self {
            allow: false,
            reason,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allow
    }

    /// `None` when allowed; otherwise whether the denial is for an anonymous
    /// or an authenticated subject.
    pub fn denial_kind(&self, subject: &Subject) -> Option<DenialKind> {
        if self.allow {
            None
        } else if subject.is_authenticated() {
            Some(DenialKind::Forbidden)
        } else {
            Some(DenialKind::Unauthenticated)
        }
    }

    fn outcome(&self) -> &'static str {
        if self.allow { "allow" } else { "deny" }
    }
}

/// Evaluates resource policies for subjects.
///
/// Cheap to clone; share one instance across request handlers.
#[derive(Clone)]
pub struct Authorizer {
    policies: Arc<PolicyRegistry>,
    permissions: PermissionResolver,
}

impl Authorizer {
    pub fn new(
        store: Arc<dyn MembershipStore>,
        catalog: Arc<PermissionCatalog>,
        policies: Arc<PolicyRegistry>,
    ) -> Self {
        let memberships = MembershipResolver::new(store);
        Self {
            policies,
            permissions: PermissionResolver::new(memberships, catalog),
        }
    }

    pub fn policies(&self) -> &PolicyRegistry {
        &self.policies
    }

    pub fn catalog(&self) -> &PermissionCatalog {
        self.permissions.catalog()
    }

    /// Decide whether `subject` may perform `action` on `resource`.
    ///
    /// # Errors
    /// - [`crate::AuthzError::Store`] when the membership lookup fails.
    pub async fn authorize(
        &self,
        subject: &Subject,
        resource: &dyn Resolvable,
        action: &str,
    ) -> AuthzResult<Decision> {
        let resource_type = resource.resource_type();
        if subject.is_superuser() {
            return Ok(self.record(
                subject,
                resource_type,
                action,
                Decision::allow(DecisionReason::SuperuserBypass),
            ));
        }

        let Some(predicate) = self.policies.lookup(resource_type, action) else {
            tracing::warn!(resource_type, action, "no policy bound; denying");
            return Ok(self.record(
                subject,
                resource_type,
                action,
                Decision::deny(DecisionReason::NoPolicy),
            ));
        };

        // Single round trip: the membership is fetched once and shared by the
        // whole predicate tree.
        let membership = match resource.project() {
            Some(project) if predicate.requires_membership() => {
                self.permissions
                    .memberships()
                    .resolve(subject, project)
                    .await?
            }
            _ => None,
        };

        let ctx = AuthzContext::new(
            subject,
            resource,
            action,
            membership.as_ref(),
            self.permissions.catalog(),
        );
        let decision = if predicate.evaluate(&ctx) {
            Decision::allow(DecisionReason::PolicyEvaluated)
        } else {
            Decision::deny(DecisionReason::PolicyEvaluated)
        };
        Ok(self.record(subject, resource_type, action, decision))
    }

    /// Effective permission set of `subject` on `project`.
    pub async fn permissions_for(
        &self,
        subject: &Subject,
        project: &Project,
    ) -> AuthzResult<HashSet<String>> {
        self.permissions.permissions_for(subject, project).await
    }

    fn record(
        &self,
        subject: &Subject,
        resource_type: &str,
        action: &str,
        decision: Decision,
    ) -> Decision {
        metrics::counter!(
            "trellis_authz_decisions_total",
            "reason" => decision.reason.as_str(),
            "outcome" => decision.outcome()
        )
        .increment(1);
        tracing::debug!(
            subject = subject.kind(),
            resource_type,
            action,
            reason = %decision.reason,
            allow = decision.allow,
            "authorization decision"
        );
        decision
    }
}
