//! Authorization error taxonomy.
//!
//! Every failure here is terminal for the request: nothing is retried inside
//! the core. The route layer maps each variant to a user-visible outcome
//! (re-login prompt, "wrong school" page, generic access denied). Storage
//! faults are kept apart from authorization outcomes; absence of a record is
//! a legitimate denial, an unreachable store is not.

use thiserror::Error;

/// Result type used across the authorization core.
pub type AuthResult<T> = Result<T, AuthError>;

/// Authorization failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Malformed token, bad signature, or inconsistent embedded claims.
    #[error("token is invalid")]
    TokenInvalid,

    /// Valid signature, but the token's expiry is in the past.
    ///
    /// Distinct from [`AuthError::TokenInvalid`] so callers can say
    /// "please log in again" rather than rejecting outright.
    #[error("token has expired")]
    TokenExpired,

    /// Token serialization failed at issue time. Not expected in normal
    /// operation.
    #[error("token encoding failed: {0}")]
    EncodingError(String),

    /// The token's subject does not exist in the store its kind points at.
    #[error("principal not found")]
    PrincipalNotFound,

    /// The principal exists but is deactivated/suspended.
    #[error("principal is inactive")]
    PrincipalInactive,

    /// The principal belongs to a different school than the request targets.
    /// Carries both codes for user-facing messaging; callers must never
    /// silently redirect into the wrong tenant's data.
    #[error("tenant mismatch: principal belongs to '{expected}', request targeted '{requested}'")]
    TenantMismatch { expected: String, requested: String },

    /// The principal's role is not in the route's allowed set. A genuine,
    /// final denial; not to be confused with a principal that has no role
    /// assigned yet (see `Verdict::Pending`).
    #[error("role is not allowed for this route")]
    RoleNotAllowed,

    /// The principal lacks the required capability.
    #[error("permission denied: missing capability '{0}'")]
    PermissionDenied(String),

    /// An effective grant of the same permission type already exists for the
    /// teacher. Grants are idempotent-by-rejection, never silently upserted.
    #[error("an effective grant of this permission type already exists")]
    DuplicateGrant,

    /// The grant id does not exist (already revoked, or never granted). The
    /// loser of a concurrent revoke race surfaces this.
    #[error("grant not found")]
    GrantNotFound,

    /// A grant request violated a delegation invariant (wrong tenant, expiry
    /// before grant time, non-teacher target, ...).
    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    /// The backing store could not be reached. An infrastructure fault, not
    /// an authorization outcome; upstream should treat it as retry-safe 5xx.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Storage-layer failure surfaced by directory/repository implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for AuthError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
        }
    }
}
