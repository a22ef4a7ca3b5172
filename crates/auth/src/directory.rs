//! Lookup contracts the core consumes from the persistence layer.
//!
//! Implementations must treat soft-deleted records (`deleted_at` set) as
//! absent; a deleted account is indistinguishable from one that never
//! existed. Any infrastructure fault surfaces as [`StoreError`], never as an
//! empty result.

use campuserp_core::PrincipalId;

use crate::error::StoreError;
use crate::principal::{StaffRecord, StudentRecord};

/// Staff account lookup.
pub trait StaffDirectory: Send + Sync {
    fn find_staff(&self, id: PrincipalId) -> Result<Option<StaffRecord>, StoreError>;
}

/// Student account lookup.
pub trait StudentDirectory: Send + Sync {
    fn find_student(&self, id: PrincipalId) -> Result<Option<StudentRecord>, StoreError>;
}
