//! In-memory directory/repository implementations for tests/dev.
//!
//! Production deployments implement the same traits against the real
//! persistence layer; these keep the core exercisable without it.

use std::collections::HashMap;
use std::sync::RwLock;

use campuserp_core::{DomainError, GrantId, PrincipalId, TenantId};

use crate::delegation::{DelegatedPermission, DelegationRepository};
use crate::directory::{StaffDirectory, StudentDirectory};
use crate::error::StoreError;
use crate::principal::{StaffRecord, StudentRecord};
use crate::tenant::{School, SchoolDirectory};

/// In-memory staff store.
#[derive(Debug, Default)]
pub struct InMemoryStaffDirectory {
    records: RwLock<HashMap<PrincipalId, StaffRecord>>,
}

impl InMemoryStaffDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub fn insert(&self, record: StaffRecord) {
        self.records.write().unwrap().insert(record.id, record);
    }
}

impl StaffDirectory for InMemoryStaffDirectory {
    fn find_staff(&self, id: PrincipalId) -> Result<Option<StaffRecord>, StoreError> {
        let records = self.records.read().unwrap();
        Ok(records
            .get(&id)
            .filter(|r| r.deleted_at.is_none())
            .cloned())
    }
}

/// In-memory student store.
#[derive(Debug, Default)]
pub struct InMemoryStudentDirectory {
    records: RwLock<HashMap<PrincipalId, StudentRecord>>,
}

impl InMemoryStudentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: StudentRecord) {
        self.records.write().unwrap().insert(record.id, record);
    }
}

impl StudentDirectory for InMemoryStudentDirectory {
    fn find_student(&self, id: PrincipalId) -> Result<Option<StudentRecord>, StoreError> {
        let records = self.records.read().unwrap();
        Ok(records
            .get(&id)
            .filter(|r| r.deleted_at.is_none())
            .cloned())
    }
}

/// In-memory school store. Enforces code uniqueness (case-insensitive).
#[derive(Debug, Default)]
pub struct InMemorySchoolDirectory {
    schools: RwLock<HashMap<TenantId, School>>,
}

impl InMemorySchoolDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, school: School) -> Result<(), DomainError> {
        let mut schools = self.schools.write().unwrap();
        let clash = schools
            .values()
            .any(|s| s.id != school.id && s.code.eq_ignore_ascii_case(&school.code));
        if clash {
            return Err(DomainError::conflict(format!(
                "school code already taken: {}",
                school.code
            )));
        }
        schools.insert(school.id, school);
        Ok(())
    }
}

impl SchoolDirectory for InMemorySchoolDirectory {
    fn find_by_id(&self, id: TenantId) -> Result<Option<School>, StoreError> {
        Ok(self.schools.read().unwrap().get(&id).cloned())
    }

    fn find_by_code(&self, code: &str) -> Result<Option<School>, StoreError> {
        let schools = self.schools.read().unwrap();
        Ok(schools
            .values()
            .find(|s| s.code.eq_ignore_ascii_case(code))
            .cloned())
    }
}

/// In-memory grant store.
#[derive(Debug, Default)]
pub struct InMemoryDelegationRepository {
    grants: RwLock<HashMap<GrantId, DelegatedPermission>>,
}

impl InMemoryDelegationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DelegationRepository for InMemoryDelegationRepository {
    fn insert(&self, grant: DelegatedPermission) -> Result<(), StoreError> {
        self.grants.write().unwrap().insert(grant.id, grant);
        Ok(())
    }

    fn insert_all(&self, grants: Vec<DelegatedPermission>) -> Result<(), StoreError> {
        // Single write lock makes the batch atomic.
        let mut map = self.grants.write().unwrap();
        for grant in grants {
            map.insert(grant.id, grant);
        }
        Ok(())
    }

    fn get(&self, id: GrantId) -> Result<Option<DelegatedPermission>, StoreError> {
        Ok(self.grants.read().unwrap().get(&id).cloned())
    }

    fn replace(&self, grant: &DelegatedPermission) -> Result<bool, StoreError> {
        let mut map = self.grants.write().unwrap();
        match map.get_mut(&grant.id) {
            Some(slot) => {
                *slot = grant.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove(&self, id: GrantId) -> Result<bool, StoreError> {
        Ok(self.grants.write().unwrap().remove(&id).is_some())
    }

    fn list_for_teacher(
        &self,
        teacher_id: PrincipalId,
    ) -> Result<Vec<DelegatedPermission>, StoreError> {
        let grants = self.grants.read().unwrap();
        let mut result: Vec<DelegatedPermission> = grants
            .values()
            .filter(|g| g.teacher_id == teacher_id)
            .cloned()
            .collect();
        // Deterministic order for callers and tests.
        result.sort_by(|a, b| {
            a.granted_at
                .cmp(&b.granted_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(result)
    }
}
