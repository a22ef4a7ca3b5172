//! Principal model: the two backing record shapes and their normalized view.
//!
//! Staff and students are structurally different records in different stores
//! (students carry no credential of their own; a session token is their only
//! proof of identity). Rather than faking one shape to satisfy code expecting
//! the other, both are modeled explicitly as a sum type and normalized once,
//! at resolution time, into [`AuthenticatedPrincipal`]. Everything downstream
//! is principal-kind-agnostic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use campuserp_core::{PrincipalId, TenantId};

use crate::roles::Role;

/// Which store a principal's backing record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    Staff,
    Student,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::Staff => "staff",
            PrincipalKind::Student => "student",
        }
    }
}

impl core::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A staff account as the user store hands it to us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRecord {
    pub id: PrincipalId,
    pub tenant_id: TenantId,
    pub email: String,
    pub display_name: String,
    /// `None` during in-flight provisioning (account created, role not yet
    /// assigned). The request guard holds such principals in a pending state
    /// instead of denying them.
    pub role: Option<Role>,
    pub is_active: bool,
    /// Soft-delete marker; set records are invisible to every lookup.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Enrollment status of a student record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    Active,
    Suspended,
    Withdrawn,
}

/// A student account as the student store hands it to us.
///
/// Note the shape difference from [`StaffRecord`]: no email of their own, no
/// assignable role, an enrollment status instead of an active flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: PrincipalId,
    pub tenant_id: TenantId,
    pub display_name: String,
    pub guardian_email: Option<String>,
    pub status: StudentStatus,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// The two backing record shapes, tagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrincipalRecord {
    Staff(StaffRecord),
    Student(StudentRecord),
}

impl PrincipalRecord {
    /// Normalize either backing record into the single request-scoped shape.
    pub fn normalize(self) -> AuthenticatedPrincipal {
        match self {
            PrincipalRecord::Staff(staff) => AuthenticatedPrincipal {
                id: staff.id,
                kind: PrincipalKind::Staff,
                role: staff.role,
                tenant_id: staff.tenant_id,
                display_name: staff.display_name,
                email: Some(staff.email),
                active: staff.is_active,
            },
            PrincipalRecord::Student(student) => AuthenticatedPrincipal {
                id: student.id,
                kind: PrincipalKind::Student,
                role: Some(Role::Student),
                tenant_id: student.tenant_id,
                display_name: student.display_name,
                email: student.guardian_email,
                active: student.status == StudentStatus::Active,
            },
        }
    }
}

/// The resolved caller of a request.
///
/// Constructed fresh per request by the resolver, never persisted. Inactive
/// principals never make it past the request guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal {
    pub id: PrincipalId,
    pub kind: PrincipalKind,
    pub role: Option<Role>,
    pub tenant_id: TenantId,
    pub display_name: String,
    pub email: Option<String>,
    pub active: bool,
}

impl AuthenticatedPrincipal {
    pub fn is_owner(&self) -> bool {
        self.role == Some(Role::Owner)
    }
}
