//! Request guard: the per-request orchestration of the authorization core.
//!
//! Stages run strictly in sequence (decode, resolve, tenant check, role
//! check, capability check) and a denial at any stage short-circuits the
//! rest (no permission evaluation ever runs after a deny). Storage faults
//! travel as `Err(StoreUnavailable)`, never as a denial verdict.

use std::sync::Arc;

use crate::error::{AuthError, AuthResult};
use crate::evaluator::PermissionEvaluator;
use crate::principal::AuthenticatedPrincipal;
use crate::resolver::PrincipalResolver;
use crate::roles::{Capability, Role};
use crate::tenant::TenantGuard;
use crate::token::TokenCodec;

use campuserp_core::Clock;

/// The sequential stages a request passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Unauthenticated,
    TokenDecoded,
    PrincipalResolved,
    TenantChecked,
    Authorized,
}

impl AuthStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStage::Unauthenticated => "unauthenticated",
            AuthStage::TokenDecoded => "token_decoded",
            AuthStage::PrincipalResolved => "principal_resolved",
            AuthStage::TenantChecked => "tenant_checked",
            AuthStage::Authorized => "authorized",
        }
    }
}

/// Outcome of an authorization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Every stage passed; the route may proceed as this principal.
    Admitted(AuthenticatedPrincipal),
    /// The principal has no role assigned yet; an in-flight provisioning
    /// state, not a denial. Callers keep showing "still authenticating"
    /// rather than flashing an incorrect access-denied view.
    Pending,
    /// A genuine, final denial at some stage.
    Denied(AuthError),
}

impl Verdict {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Verdict::Admitted(_))
    }
}

/// Orchestrates codec, resolver, tenant guard, and evaluator per request.
pub struct RequestGuard {
    codec: TokenCodec,
    resolver: PrincipalResolver,
    tenants: TenantGuard,
    evaluator: PermissionEvaluator,
    clock: Arc<dyn Clock>,
}

impl RequestGuard {
    pub fn new(
        codec: TokenCodec,
        resolver: PrincipalResolver,
        tenants: TenantGuard,
        evaluator: PermissionEvaluator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { codec, resolver, tenants, evaluator, clock }
    }

    /// Decode a bearer token and resolve its principal.
    ///
    /// The single entry point every protected route uses to establish
    /// identity. Inactive principals never come out of here.
    pub fn authenticate(&self, token: &str) -> AuthResult<AuthenticatedPrincipal> {
        let claims = self.codec.decode(token)?;
        tracing::debug!(stage = AuthStage::TokenDecoded.as_str(), subject = %claims.sub, "token decoded");

        let principal = self.resolver.resolve(&claims)?;
        tracing::debug!(stage = AuthStage::PrincipalResolved.as_str(), principal = %principal.id, "principal resolved");

        if !principal.active {
            return Err(AuthError::PrincipalInactive);
        }
        Ok(principal)
    }

    /// Run the post-authentication stages for a route.
    ///
    /// `allowed_roles` empty means any authenticated role may pass the role
    /// stage. `required_capability` adds the final permission check.
    pub fn authorize(
        &self,
        principal: &AuthenticatedPrincipal,
        tenant_code: &str,
        allowed_roles: &[Role],
        required_capability: Option<Capability>,
    ) -> AuthResult<Verdict> {
        // Callers may hold a principal resolved earlier in the request; its
        // account can have been deactivated since. Never admit it.
        if !principal.active {
            return Ok(Verdict::Denied(AuthError::PrincipalInactive));
        }

        // Tenant scope first: a correctly-permissioned principal in the
        // wrong school must never reach the capability stage.
        match self.tenants.check_tenant_scope(principal, tenant_code) {
            Ok(()) => {
                tracing::debug!(stage = AuthStage::TenantChecked.as_str(), principal = %principal.id, "tenant scope ok");
            }
            Err(err @ AuthError::TenantMismatch { .. }) => {
                return Ok(Verdict::Denied(err));
            }
            Err(err) => return Err(err),
        }

        let Some(role) = principal.role else {
            tracing::debug!(principal = %principal.id, "principal has no role yet, holding");
            return Ok(Verdict::Pending);
        };

        if !allowed_roles.is_empty() && !allowed_roles.contains(&role) {
            tracing::warn!(principal = %principal.id, role = %role, "role not allowed for route");
            return Ok(Verdict::Denied(AuthError::RoleNotAllowed));
        }

        if let Some(capability) = required_capability {
            if !self.evaluator.can(principal, capability, self.clock.now())? {
                tracing::warn!(
                    principal = %principal.id,
                    capability = %capability,
                    "capability check failed"
                );
                return Ok(Verdict::Denied(AuthError::PermissionDenied(
                    capability.as_str().to_string(),
                )));
            }
        }

        tracing::debug!(stage = AuthStage::Authorized.as_str(), principal = %principal.id, "admitted");
        Ok(Verdict::Admitted(principal.clone()))
    }

    /// Full pipeline in one call: the shape route middleware consumes.
    pub fn check(
        &self,
        token: &str,
        tenant_code: &str,
        allowed_roles: &[Role],
        required_capability: Option<Capability>,
    ) -> AuthResult<Verdict> {
        let principal = match self.authenticate(token) {
            Ok(principal) => principal,
            Err(err @ AuthError::StoreUnavailable(_)) => return Err(err),
            Err(err) => return Ok(Verdict::Denied(err)),
        };
        self.authorize(&principal, tenant_code, allowed_roles, required_capability)
    }

    /// Point-in-time capability query against the injected clock, for UI
    /// conditional rendering ("show the delete button or not").
    pub fn can(
        &self,
        principal: &AuthenticatedPrincipal,
        capability: Capability,
    ) -> AuthResult<bool> {
        self.evaluator.can(principal, capability, self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;

    use campuserp_core::{FixedClock, PrincipalId, TenantId};

    use crate::delegation::DelegationStore;
    use crate::memory::{
        InMemoryDelegationRepository, InMemorySchoolDirectory, InMemoryStaffDirectory,
        InMemoryStudentDirectory,
    };
    use crate::principal::{PrincipalKind, StaffRecord};
    use crate::tenant::School;

    struct Fixture {
        guard: RequestGuard,
        tenant_id: TenantId,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let tenant_id = TenantId::new();

        let schools = Arc::new(InMemorySchoolDirectory::new());
        schools
            .insert(School {
                id: tenant_id,
                code: "GHS".to_string(),
                name: "Greenfield High".to_string(),
                owner_principal_id: PrincipalId::new(),
            })
            .unwrap();

        let staff = Arc::new(InMemoryStaffDirectory::new());
        let students = Arc::new(InMemoryStudentDirectory::new());
        let repo = Arc::new(InMemoryDelegationRepository::new());

        let store = Arc::new(DelegationStore::new(repo, staff.clone(), clock.clone()));
        let guard = RequestGuard::new(
            TokenCodec::new(b"guard-test-secret"),
            PrincipalResolver::new(staff, students),
            TenantGuard::new(schools),
            PermissionEvaluator::new(store),
            clock,
        );

        Fixture { guard, tenant_id }
    }

    fn principal(role: Option<Role>, tenant_id: TenantId) -> AuthenticatedPrincipal {
        AuthenticatedPrincipal {
            id: PrincipalId::new(),
            kind: PrincipalKind::Staff,
            role,
            tenant_id,
            display_name: "P".to_string(),
            email: None,
            active: true,
        }
    }

    #[test]
    fn inactive_principal_is_denied_even_without_a_capability_stage() {
        let f = fixture();
        // In-tenant, role allowed, no capability required: the only thing
        // wrong with this principal is that its account was deactivated.
        let mut p = principal(Some(Role::Teacher), f.tenant_id);
        p.active = false;

        let verdict = f
            .guard
            .authorize(&p, "GHS", &[Role::Teacher], None)
            .unwrap();
        assert_eq!(verdict, Verdict::Denied(AuthError::PrincipalInactive));
    }

    #[test]
    fn roleless_principal_is_held_pending_not_denied() {
        let f = fixture();
        let p = principal(None, f.tenant_id);

        let verdict = f
            .guard
            .authorize(&p, "GHS", &[Role::Admin], None)
            .unwrap();
        assert_eq!(verdict, Verdict::Pending);
    }

    #[test]
    fn role_outside_the_allowed_set_is_a_final_denial() {
        let f = fixture();
        let p = principal(Some(Role::Teacher), f.tenant_id);

        let verdict = f
            .guard
            .authorize(&p, "GHS", &[Role::Owner, Role::Admin], None)
            .unwrap();
        assert_eq!(verdict, Verdict::Denied(AuthError::RoleNotAllowed));
    }

    #[test]
    fn empty_allowed_set_admits_any_role() {
        let f = fixture();
        let p = principal(Some(Role::Parent), f.tenant_id);

        assert!(f.guard.authorize(&p, "ghs", &[], None).unwrap().is_admitted());
    }

    #[test]
    fn missing_capability_is_denied_with_its_name() {
        let f = fixture();
        let p = principal(Some(Role::Teacher), f.tenant_id);

        let verdict = f
            .guard
            .authorize(&p, "GHS", &[], Some(Capability::ManageFees))
            .unwrap();
        assert_eq!(
            verdict,
            Verdict::Denied(AuthError::PermissionDenied("manage_fees".to_string()))
        );
    }

    #[test]
    fn tenant_mismatch_wins_over_everything_else() {
        let f = fixture();
        // An admin with broad capabilities, but in the wrong school.
        let p = principal(Some(Role::Admin), TenantId::new());

        let verdict = f
            .guard
            .authorize(&p, "GHS", &[Role::Admin], Some(Capability::ManageFees))
            .unwrap();
        assert!(matches!(
            verdict,
            Verdict::Denied(AuthError::TenantMismatch { .. })
        ));
    }

    #[test]
    fn check_turns_token_failures_into_denials() {
        let f = fixture();
        let verdict = f.guard.check("garbage", "GHS", &[], None).unwrap();
        assert_eq!(verdict, Verdict::Denied(AuthError::TokenInvalid));
    }

    #[test]
    fn check_admits_a_valid_staff_token_end_to_end() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let tenant_id = TenantId::new();
        let admin_id = PrincipalId::new();

        let schools = Arc::new(InMemorySchoolDirectory::new());
        schools
            .insert(School {
                id: tenant_id,
                code: "GHS".to_string(),
                name: "Greenfield High".to_string(),
                owner_principal_id: PrincipalId::new(),
            })
            .unwrap();

        let staff = Arc::new(InMemoryStaffDirectory::new());
        staff.insert(StaffRecord {
            id: admin_id,
            tenant_id,
            email: "admin@ghs.example".to_string(),
            display_name: "Admin".to_string(),
            role: Some(Role::Admin),
            is_active: true,
            deleted_at: None,
        });

        let codec = TokenCodec::new(b"guard-test-secret");
        let store = Arc::new(DelegationStore::new(
            Arc::new(InMemoryDelegationRepository::new()),
            staff.clone(),
            clock.clone(),
        ));
        let guard = RequestGuard::new(
            codec.clone(),
            PrincipalResolver::new(staff, Arc::new(InMemoryStudentDirectory::new())),
            TenantGuard::new(schools),
            PermissionEvaluator::new(store),
            clock.clone(),
        );

        let mut admin = principal(Some(Role::Admin), tenant_id);
        admin.id = admin_id;
        let token = codec
            .issue(&admin, chrono::Duration::hours(1), clock.now())
            .unwrap();

        let verdict = guard
            .check(&token, "ghs", &[Role::Admin], Some(Capability::ManageStudents))
            .unwrap();
        assert!(verdict.is_admitted());
    }
}
