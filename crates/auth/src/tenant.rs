//! Schools (tenants) and the tenant scope guard.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use campuserp_core::{PrincipalId, TenantId};

use crate::error::{AuthError, AuthResult, StoreError};
use crate::principal::AuthenticatedPrincipal;

/// A school: the tenant boundary of the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct School {
    pub id: TenantId,
    /// Unique, compared case-insensitively (`"GHS"` and `"ghs"` are the same
    /// school).
    pub code: String,
    pub name: String,
    pub owner_principal_id: PrincipalId,
}

/// School lookup contract consumed from the persistence layer.
pub trait SchoolDirectory: Send + Sync {
    fn find_by_id(&self, id: TenantId) -> Result<Option<School>, StoreError>;

    /// Case-insensitive code lookup.
    fn find_by_code(&self, code: &str) -> Result<Option<School>, StoreError>;
}

/// Verifies that a principal may act within the school a request targets.
///
/// Tenant resolution is centralized here; callers pass the requested school
/// code explicitly instead of re-deriving it from ambient state. This guard
/// runs strictly before any capability or permission check: a correctly
/// permissioned principal in the wrong school is never admitted.
pub struct TenantGuard {
    schools: Arc<dyn SchoolDirectory>,
}

impl TenantGuard {
    pub fn new(schools: Arc<dyn SchoolDirectory>) -> Self {
        Self { schools }
    }

    /// Admit (`Ok`) or deny (`Err(TenantMismatch)`) a principal for the
    /// school identified by `requested_code`.
    ///
    /// Owners are the one tenant-spanning exception: they are admitted to any
    /// school they own, verified by an ownership lookup rather than by token
    /// tenant equality. Everyone else must belong to the requested school.
    pub fn check_tenant_scope(
        &self,
        principal: &AuthenticatedPrincipal,
        requested_code: &str,
    ) -> AuthResult<()> {
        let requested = self.schools.find_by_code(requested_code)?;

        if let Some(school) = &requested {
            let admitted = if principal.is_owner() {
                school.owner_principal_id == principal.id
            } else {
                school.id == principal.tenant_id
            };
            if admitted {
                tracing::debug!(
                    principal = %principal.id,
                    school = %school.code,
                    "tenant scope admitted"
                );
                return Ok(());
            }
        }

        // Resolve the principal's own school code for the user-facing message;
        // fall back to the raw tenant id if the record is gone.
        let expected = self
            .schools
            .find_by_id(principal.tenant_id)?
            .map(|s| s.code)
            .unwrap_or_else(|| principal.tenant_id.to_string());

        tracing::warn!(
            principal = %principal.id,
            expected = %expected,
            requested = %requested_code,
            "tenant mismatch"
        );

        Err(AuthError::TenantMismatch {
            expected,
            requested: requested_code.to_string(),
        })
    }
}
