//! Base roles and the static role-to-capability map.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use campuserp_core::DomainError;

/// Base role of a principal within its school.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// School owner; may also operate across other schools it owns.
    Owner,
    Admin,
    Teacher,
    Student,
    Parent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Parent => "parent",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            "parent" => Ok(Role::Parent),
            other => Err(DomainError::validation(format!("unknown role: {other}"))),
        }
    }
}

/// A coarse or fine-grained capability.
///
/// Capabilities are what callers check; roles are how capabilities are
/// assigned. Delegated permissions grant individual capabilities to teachers
/// on top of their base role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageStaff,
    ManageStudents,
    ManageFees,
    ManageGrades,
    ManageAttendance,
    ManageDocuments,
    SendCommunications,
    /// Granting, updating, and revoking delegated permissions.
    ManageDelegations,
    /// Read access to the principal's own records (the student/parent view).
    /// Enforcing *which* records count as "own" is the data layer's
    /// responsibility, not this map's.
    ViewOwnRecords,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ManageStaff => "manage_staff",
            Capability::ManageStudents => "manage_students",
            Capability::ManageFees => "manage_fees",
            Capability::ManageGrades => "manage_grades",
            Capability::ManageAttendance => "manage_attendance",
            Capability::ManageDocuments => "manage_documents",
            Capability::SendCommunications => "send_communications",
            Capability::ManageDelegations => "manage_delegations",
            Capability::ViewOwnRecords => "view_own_records",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every capability an owner or admin holds by virtue of their role.
const BROAD: &[Capability] = &[
    Capability::ManageStaff,
    Capability::ManageStudents,
    Capability::ManageFees,
    Capability::ManageGrades,
    Capability::ManageAttendance,
    Capability::ManageDocuments,
    Capability::SendCommunications,
    Capability::ManageDelegations,
    Capability::ViewOwnRecords,
];

/// Base capabilities of a role.
///
/// Pure lookup, no failure mode: callers that find nothing here fail closed
/// by default. Teachers additionally receive whatever delegated permissions
/// are effective at evaluation time; that union is the evaluator's job, not
/// this map's.
pub fn capabilities_for(role: Role) -> &'static [Capability] {
    match role {
        Role::Owner | Role::Admin => BROAD,
        Role::Teacher => &[Capability::ManageAttendance, Capability::ViewOwnRecords],
        Role::Student | Role::Parent => &[Capability::ViewOwnRecords],
    }
}
