//! Delegated permissions: time-bound grants to teachers on top of their base
//! role.
//!
//! Expiry is evaluated lazily against the caller-supplied instant; there is
//! no background sweep, so storage may hold expired-but-stored records until
//! next touched. Validity is authoritative per school, not per teacher.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use campuserp_core::{Clock, GrantId, PrincipalId, TenantId};

use crate::directory::StaffDirectory;
use crate::error::{AuthError, AuthResult, StoreError};
use crate::principal::AuthenticatedPrincipal;
use crate::roles::{Capability, Role, capabilities_for};

/// A single delegated-permission grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatedPermission {
    pub id: GrantId,
    pub tenant_id: TenantId,
    pub teacher_id: PrincipalId,
    pub permission_type: Capability,
    pub is_active: bool,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl DelegatedPermission {
    /// Effective iff active and not yet expired at `now`.
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|at| at > now)
    }
}

/// Persistence contract for grant records (consumed from the storage layer).
///
/// Write operations on the same grant id must not both appear to succeed
/// under concurrency: the loser of a grant/revoke race observes a missing
/// record (`Ok(false)`), never a silent double-success.
pub trait DelegationRepository: Send + Sync {
    fn insert(&self, grant: DelegatedPermission) -> Result<(), StoreError>;

    /// Atomic batch insert: either every grant lands or none do.
    fn insert_all(&self, grants: Vec<DelegatedPermission>) -> Result<(), StoreError>;

    fn get(&self, id: GrantId) -> Result<Option<DelegatedPermission>, StoreError>;

    /// Overwrite an existing record; `Ok(false)` if it no longer exists.
    fn replace(&self, grant: &DelegatedPermission) -> Result<bool, StoreError>;

    /// Hard-delete; `Ok(false)` if the record was already gone.
    fn remove(&self, id: GrantId) -> Result<bool, StoreError>;

    fn list_for_teacher(
        &self,
        teacher_id: PrincipalId,
    ) -> Result<Vec<DelegatedPermission>, StoreError>;
}

/// Fields an update may change. `None` leaves the field untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantUpdate {
    pub is_active: Option<bool>,
    /// `Some(None)` clears the expiry, making the grant open-ended;
    /// `Some(Some(at))` moves it.
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

/// Grant lifecycle operations over a [`DelegationRepository`].
///
/// Every write requires an actor holding `manage_delegations` (owners and
/// admins), and validates the target teacher against the staff directory.
pub struct DelegationStore {
    repo: Arc<dyn DelegationRepository>,
    staff: Arc<dyn StaffDirectory>,
    clock: Arc<dyn Clock>,
}

impl DelegationStore {
    pub fn new(
        repo: Arc<dyn DelegationRepository>,
        staff: Arc<dyn StaffDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { repo, staff, clock }
    }

    /// Grant one permission type to a teacher, optionally time-bound.
    ///
    /// Rejects with [`AuthError::DuplicateGrant`] while an effective grant of
    /// the same type exists; re-granting is allowed once the earlier grant
    /// has expired or been revoked.
    pub fn grant(
        &self,
        actor: &AuthenticatedPrincipal,
        tenant_id: TenantId,
        teacher_id: PrincipalId,
        permission_type: Capability,
        expires_at: Option<DateTime<Utc>>,
    ) -> AuthResult<DelegatedPermission> {
        self.ensure_actor_may_manage(actor, tenant_id)?;
        let now = self.clock.now();

        let grant = self.validate(tenant_id, teacher_id, permission_type, expires_at, now)?;

        let existing = self.repo.list_for_teacher(teacher_id)?;
        if existing
            .iter()
            .any(|g| g.permission_type == permission_type && g.is_effective(now))
        {
            return Err(AuthError::DuplicateGrant);
        }

        self.repo.insert(grant.clone())?;
        tracing::info!(
            teacher = %teacher_id,
            permission = %permission_type,
            "delegated permission granted"
        );
        Ok(grant)
    }

    /// Grant several permission types at once, all-or-nothing: if any single
    /// grant fails validation, none are committed.
    pub fn grant_bulk(
        &self,
        actor: &AuthenticatedPrincipal,
        tenant_id: TenantId,
        teacher_id: PrincipalId,
        permission_types: &[Capability],
    ) -> AuthResult<Vec<DelegatedPermission>> {
        self.ensure_actor_may_manage(actor, tenant_id)?;
        let now = self.clock.now();

        let existing = self.repo.list_for_teacher(teacher_id)?;
        let mut grants = Vec::with_capacity(permission_types.len());
        for &permission_type in permission_types {
            let grant = self.validate(tenant_id, teacher_id, permission_type, None, now)?;
            let duplicate = existing
                .iter()
                .any(|g| g.permission_type == permission_type && g.is_effective(now))
                || grants
                    .iter()
                    .any(|g: &DelegatedPermission| g.permission_type == permission_type);
            if duplicate {
                return Err(AuthError::DuplicateGrant);
            }
            grants.push(grant);
        }

        self.repo.insert_all(grants.clone())?;
        tracing::info!(
            teacher = %teacher_id,
            count = grants.len(),
            "delegated permissions granted in bulk"
        );
        Ok(grants)
    }

    /// Hard-delete a grant. Once revoked, the record is never again counted
    /// as effective; a later re-grant gets a fresh id.
    pub fn revoke(&self, actor: &AuthenticatedPrincipal, id: GrantId) -> AuthResult<()> {
        self.ensure_actor(actor)?;
        if !self.repo.remove(id)? {
            return Err(AuthError::GrantNotFound);
        }
        tracing::info!(grant = %id, "delegated permission revoked");
        Ok(())
    }

    /// Toggle the active flag and/or move (or clear) the expiry of an
    /// existing grant.
    pub fn update(
        &self,
        actor: &AuthenticatedPrincipal,
        id: GrantId,
        update: GrantUpdate,
    ) -> AuthResult<DelegatedPermission> {
        self.ensure_actor(actor)?;

        let mut grant = self.repo.get(id)?.ok_or(AuthError::GrantNotFound)?;
        if let Some(is_active) = update.is_active {
            grant.is_active = is_active;
        }
        if let Some(expires_at) = update.expires_at {
            if let Some(at) = expires_at {
                if at < grant.granted_at {
                    return Err(AuthError::InvalidGrant(
                        "expiry precedes grant time".to_string(),
                    ));
                }
            }
            grant.expires_at = expires_at;
        }

        // A concurrent revoke may have removed the record since the read.
        if !self.repo.replace(&grant)? {
            return Err(AuthError::GrantNotFound);
        }
        Ok(grant)
    }

    /// All grants for a teacher; `include_inactive` adds deactivated ones.
    /// Expired-but-active grants are listed either way (expiry is a query
    /// concern, not a storage state).
    pub fn list_for_teacher(
        &self,
        teacher_id: PrincipalId,
        include_inactive: bool,
    ) -> AuthResult<Vec<DelegatedPermission>> {
        let grants = self.repo.list_for_teacher(teacher_id)?;
        Ok(grants
            .into_iter()
            .filter(|g| include_inactive || g.is_active)
            .collect())
    }

    /// Grants effective at `now`. The only read path the permission
    /// evaluator uses.
    pub fn list_effective_for_teacher(
        &self,
        teacher_id: PrincipalId,
        now: DateTime<Utc>,
    ) -> AuthResult<Vec<DelegatedPermission>> {
        let grants = self.repo.list_for_teacher(teacher_id)?;
        Ok(grants.into_iter().filter(|g| g.is_effective(now)).collect())
    }

    fn validate(
        &self,
        tenant_id: TenantId,
        teacher_id: PrincipalId,
        permission_type: Capability,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> AuthResult<DelegatedPermission> {
        if permission_type == Capability::ManageDelegations {
            return Err(AuthError::InvalidGrant(
                "delegation management cannot itself be delegated".to_string(),
            ));
        }

        let teacher = self
            .staff
            .find_staff(teacher_id)?
            .ok_or(AuthError::PrincipalNotFound)?;
        if teacher.role != Some(Role::Teacher) {
            return Err(AuthError::InvalidGrant(
                "delegated permissions can only target teachers".to_string(),
            ));
        }
        if teacher.tenant_id != tenant_id {
            return Err(AuthError::InvalidGrant(
                "teacher belongs to a different school".to_string(),
            ));
        }
        if let Some(at) = expires_at {
            if at < now {
                return Err(AuthError::InvalidGrant(
                    "expiry precedes grant time".to_string(),
                ));
            }
        }

        Ok(DelegatedPermission {
            id: GrantId::new(),
            tenant_id,
            teacher_id,
            permission_type,
            is_active: true,
            granted_at: now,
            expires_at,
        })
    }

    fn ensure_actor(&self, actor: &AuthenticatedPrincipal) -> AuthResult<()> {
        let holds_capability = actor
            .role
            .map(capabilities_for)
            .unwrap_or_default()
            .contains(&Capability::ManageDelegations);
        if !actor.active || !holds_capability {
            return Err(AuthError::PermissionDenied(
                Capability::ManageDelegations.as_str().to_string(),
            ));
        }
        Ok(())
    }

    fn ensure_actor_may_manage(
        &self,
        actor: &AuthenticatedPrincipal,
        tenant_id: TenantId,
    ) -> AuthResult<()> {
        self.ensure_actor(actor)?;
        // Admins manage their own school only; owners span the schools they
        // own (route-level tenancy is the tenant guard's job).
        if !actor.is_owner() && actor.tenant_id != tenant_id {
            return Err(AuthError::PermissionDenied(
                Capability::ManageDelegations.as_str().to_string(),
            ));
        }
        Ok(())
    }
}
