//! Principal resolution: decoded claims to a normalized principal.

use std::sync::Arc;

use crate::directory::{StaffDirectory, StudentDirectory};
use crate::error::{AuthError, AuthResult};
use crate::principal::{AuthenticatedPrincipal, PrincipalKind, PrincipalRecord, StudentStatus};
use crate::token::SessionClaims;

/// Loads the concrete backing record for a token's subject and normalizes it.
///
/// The branch on `claims.kind` is the crux: staff and students live in
/// different stores, and a subject id is only ever looked up in the store its
/// kind points at. A token claiming a kind whose store has no such subject
/// fails closed with `PrincipalNotFound`; it is never retried against the
/// other store.
pub struct PrincipalResolver {
    staff: Arc<dyn StaffDirectory>,
    students: Arc<dyn StudentDirectory>,
}

impl PrincipalResolver {
    pub fn new(staff: Arc<dyn StaffDirectory>, students: Arc<dyn StudentDirectory>) -> Self {
        Self { staff, students }
    }

    pub fn resolve(&self, claims: &SessionClaims) -> AuthResult<AuthenticatedPrincipal> {
        let record = match claims.kind {
            PrincipalKind::Staff => {
                let staff = self
                    .staff
                    .find_staff(claims.sub)?
                    .ok_or(AuthError::PrincipalNotFound)?;
                if !staff.is_active {
                    tracing::warn!(principal = %claims.sub, "staff account is deactivated");
                    return Err(AuthError::PrincipalInactive);
                }
                PrincipalRecord::Staff(staff)
            }
            PrincipalKind::Student => {
                let student = self
                    .students
                    .find_student(claims.sub)?
                    .ok_or(AuthError::PrincipalNotFound)?;
                if student.status != StudentStatus::Active {
                    tracing::warn!(principal = %claims.sub, "student is not actively enrolled");
                    return Err(AuthError::PrincipalInactive);
                }
                PrincipalRecord::Student(student)
            }
        };

        Ok(record.normalize())
    }
}
