//! Point-in-time permission evaluation.
//!
//! Combines the static role-capability map with whatever delegated grants
//! are effective at the supplied instant. Evaluation is deterministic: the
//! same principal, capability, and `now` always produce the same answer, and
//! no partial state is cached between checks.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use campuserp_core::{PrincipalId, TenantId};

use crate::delegation::DelegationStore;
use crate::error::AuthResult;
use crate::principal::AuthenticatedPrincipal;
use crate::roles::{Capability, Role, capabilities_for};

pub struct PermissionEvaluator {
    delegations: Arc<DelegationStore>,
}

impl PermissionEvaluator {
    pub fn new(delegations: Arc<DelegationStore>) -> Self {
        Self { delegations }
    }

    /// The full capability set of a principal at `now`: base role
    /// capabilities, plus (for teachers only) effective delegated grants.
    pub fn effective_permissions(
        &self,
        principal: &AuthenticatedPrincipal,
        now: DateTime<Utc>,
    ) -> AuthResult<BTreeSet<Capability>> {
        if !principal.active {
            return Ok(BTreeSet::new());
        }

        let mut set: BTreeSet<Capability> = principal
            .role
            .map(capabilities_for)
            .unwrap_or_default()
            .iter()
            .copied()
            .collect();

        if principal.role == Some(Role::Teacher) {
            for grant in self
                .delegations
                .list_effective_for_teacher(principal.id, now)?
            {
                set.insert(grant.permission_type);
            }
        }

        Ok(set)
    }

    /// May `principal` exercise `capability` at `now`?
    ///
    /// Base-role capabilities short-circuit without touching the store;
    /// only teachers with a miss on the base set pay the delegation read.
    pub fn can(
        &self,
        principal: &AuthenticatedPrincipal,
        capability: Capability,
        now: DateTime<Utc>,
    ) -> AuthResult<bool> {
        if !principal.active {
            return Ok(false);
        }
        let Some(role) = principal.role else {
            return Ok(false);
        };

        if capabilities_for(role).contains(&capability) {
            return Ok(true);
        }
        if role != Role::Teacher {
            return Ok(false);
        }

        let delegated = self
            .delegations
            .list_effective_for_teacher(principal.id, now)?
            .iter()
            .any(|g| g.permission_type == capability);
        Ok(delegated)
    }

    /// Explain a capability decision (or the decision that would be made).
    ///
    /// Answers "why was this denied?" for the admin-facing audit surface;
    /// serializable so the application can return it verbatim.
    pub fn explain(
        &self,
        principal: &AuthenticatedPrincipal,
        capability: Capability,
        now: DateTime<Utc>,
    ) -> AuthResult<CapabilityExplanation> {
        let effective = self.effective_permissions(principal, now)?;
        let granted = effective.contains(&capability);

        let state = PrincipalState {
            principal_id: principal.id,
            tenant_id: principal.tenant_id,
            role: principal.role.map(|r| r.as_str().to_string()),
            effective_capabilities: effective.iter().map(|c| c.as_str().to_string()).collect(),
        };

        let (reason, denial) = if granted {
            (
                format!("principal holds capability '{capability}'"),
                None,
            )
        } else if !principal.active {
            (
                "principal is inactive; inactive principals hold no capabilities".to_string(),
                Some(DenialReason {
                    kind: DenialKind::InactivePrincipal,
                    message: "reactivate the account before checking capabilities".to_string(),
                }),
            )
        } else {
            (
                format!("principal does not hold capability '{capability}'"),
                Some(DenialReason {
                    kind: DenialKind::MissingCapability,
                    message: match principal.role {
                        Some(Role::Teacher) => format!(
                            "no base or effective delegated grant of '{capability}'; an admin can delegate it"
                        ),
                        _ => format!("the role does not include '{capability}'"),
                    },
                }),
            )
        };

        Ok(CapabilityExplanation {
            required_capability: capability.as_str().to_string(),
            granted,
            reason,
            principal: state,
            denial,
        })
    }
}

/// Detailed explanation of a capability decision.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityExplanation {
    pub required_capability: String,
    pub granted: bool,
    pub reason: String,
    pub principal: PrincipalState,
    pub denial: Option<DenialReason>,
}

/// The principal's state as evaluated.
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub principal_id: PrincipalId,
    pub tenant_id: TenantId,
    pub role: Option<String>,
    pub effective_capabilities: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    InactivePrincipal,
    MissingCapability,
}
