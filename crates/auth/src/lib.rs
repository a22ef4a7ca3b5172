//! `campuserp-auth` — school-scoped, multi-principal authorization core.
//!
//! This crate is intentionally decoupled from HTTP and storage: it owns no
//! wire format and no persistence engine. Routes hand it a bearer token and
//! a requested school code; it hands back a typed verdict. Storage is
//! consumed through the directory/repository traits, time through an
//! injectable clock.

pub mod delegation;
pub mod directory;
pub mod error;
pub mod evaluator;
pub mod guard;
pub mod memory;
pub mod principal;
pub mod resolver;
pub mod roles;
pub mod tenant;
pub mod token;

pub use delegation::{DelegatedPermission, DelegationRepository, DelegationStore, GrantUpdate};
pub use directory::{StaffDirectory, StudentDirectory};
pub use error::{AuthError, AuthResult, StoreError};
pub use evaluator::{CapabilityExplanation, PermissionEvaluator};
pub use guard::{AuthStage, RequestGuard, Verdict};
pub use principal::{
    AuthenticatedPrincipal, PrincipalKind, PrincipalRecord, StaffRecord, StudentRecord,
    StudentStatus,
};
pub use resolver::PrincipalResolver;
pub use roles::{Capability, Role, capabilities_for};
pub use tenant::{School, SchoolDirectory, TenantGuard};
pub use token::{SessionClaims, TokenCodec};
