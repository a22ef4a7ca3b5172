//! Session token codec.
//!
//! Stateless HS256 encode/decode over a shared signing key. The signing
//! scheme itself is a trusted primitive; what this module owns is the claim
//! shape, the expiry semantics, and the kind/role consistency invariant.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use campuserp_core::{PrincipalId, TenantId};

use crate::error::{AuthError, AuthResult};
use crate::principal::{AuthenticatedPrincipal, PrincipalKind};
use crate::roles::Role;

/// Claims carried by a session token. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the principal's id in whichever store `kind` points at.
    pub sub: PrincipalId,
    pub kind: PrincipalKind,
    /// Absent while a staff account is mid-provisioning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub tenant_id: TenantId,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    /// Kind/role consistency: a student token must carry the student role.
    fn is_consistent(&self) -> bool {
        match self.kind {
            PrincipalKind::Staff => self.role != Some(Role::Student),
            PrincipalKind::Student => self.role == Some(Role::Student),
        }
    }
}

/// Encodes and decodes signed session tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Produce a signed token for a resolved principal.
    ///
    /// Fails with [`AuthError::EncodingError`] only on serialization failure,
    /// which is not expected in normal operation.
    pub fn issue(
        &self,
        principal: &AuthenticatedPrincipal,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> AuthResult<String> {
        let claims = SessionClaims {
            sub: principal.id,
            kind: principal.kind,
            role: principal.role,
            tenant_id: principal.tenant_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::EncodingError(e.to_string()))
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// `TokenExpired` (valid signature, `exp` in the past) is reported
    /// separately from `TokenInvalid` (everything else) so callers can prompt
    /// a re-login instead of rejecting outright.
    pub fn decode(&self, token: &str) -> AuthResult<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Exact expiry; delegated-permission tests rely on boundary precision
        // and tokens get the same treatment.
        validation.leeway = 0;

        let data = decode::<SessionClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            }
        })?;

        if !data.claims.is_consistent() {
            tracing::warn!(
                kind = %data.claims.kind,
                "token kind/role mismatch, rejecting"
            );
            return Err(AuthError::TokenInvalid);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::{PrincipalRecord, StaffRecord, StudentRecord, StudentStatus};

    fn codec() -> TokenCodec {
        TokenCodec::new(b"test-signing-secret")
    }

    fn staff_principal() -> AuthenticatedPrincipal {
        PrincipalRecord::Staff(StaffRecord {
            id: PrincipalId::new(),
            tenant_id: TenantId::new(),
            email: "teacher@ghs.example".to_string(),
            display_name: "T. Okafor".to_string(),
            role: Some(Role::Teacher),
            is_active: true,
            deleted_at: None,
        })
        .normalize()
    }

    #[test]
    fn issue_then_decode_round_trips_claims() {
        let codec = codec();
        let principal = staff_principal();
        let now = Utc::now();

        let token = codec.issue(&principal, Duration::hours(8), now).unwrap();
        let claims = codec.decode(&token).unwrap();

        assert_eq!(claims.sub, principal.id);
        assert_eq!(claims.kind, PrincipalKind::Staff);
        assert_eq!(claims.role, Some(Role::Teacher));
        assert_eq!(claims.tenant_id, principal.tenant_id);
    }

    #[test]
    fn expired_token_is_reported_as_expired_not_invalid() {
        let codec = codec();
        let principal = staff_principal();
        let issued = Utc::now() - Duration::hours(2);

        let token = codec.issue(&principal, Duration::hours(1), issued).unwrap();
        assert_eq!(codec.decode(&token).unwrap_err(), AuthError::TokenExpired);
    }

    #[test]
    fn garbage_is_invalid() {
        assert_eq!(
            codec().decode("not.a.token").unwrap_err(),
            AuthError::TokenInvalid
        );
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let principal = staff_principal();
        let token = codec()
            .issue(&principal, Duration::hours(1), Utc::now())
            .unwrap();

        let other = TokenCodec::new(b"a-different-secret");
        assert_eq!(other.decode(&token).unwrap_err(), AuthError::TokenInvalid);
    }

    #[test]
    fn student_token_must_carry_the_student_role() {
        let codec = codec();
        let student = PrincipalRecord::Student(StudentRecord {
            id: PrincipalId::new(),
            tenant_id: TenantId::new(),
            display_name: "Amina K".to_string(),
            guardian_email: None,
            status: StudentStatus::Active,
            deleted_at: None,
        })
        .normalize();

        // Forge inconsistent claims by issuing for a student principal whose
        // role has been tampered to a staff role.
        let mut tampered = student;
        tampered.role = Some(Role::Admin);

        let token = codec.issue(&tampered, Duration::hours(1), Utc::now()).unwrap();
        assert_eq!(codec.decode(&token).unwrap_err(), AuthError::TokenInvalid);
    }
}
