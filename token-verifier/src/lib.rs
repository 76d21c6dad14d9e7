//! Bearer token issuance and verification (spec §4.A).
//!
//! Used identically by the HTTP `Authorization: Bearer` extractor in
//! `meeting-api` and the socket handshake `auth.token` check in
//! `signaling-server`, so both front doors agree on one notion of identity.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use meeting_types::AccessTokenClaims;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("token is missing or malformed")]
    Invalid,
    #[error("token has expired")]
    Expired,
}

/// Minimal view of a user record the verifier needs to finish authentication
/// (spec §4.A: "resolve userId to an active user record").
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub user_id: String,
    pub username: String,
    pub is_guest: bool,
}

#[derive(Clone)]
pub struct TokenVerifier {
    secret: String,
}

impl TokenVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Sign a new access token for a just-authenticated user.
    pub fn issue(&self, user_id: &str, username: &str, is_guest: bool) -> String {
        let now = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            is_guest,
            iat: now,
            exp: now + AccessTokenClaims::DEFAULT_TTL_SECS,
            iss: AccessTokenClaims::ISSUER.to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .expect("HS256 encoding of a well-formed claims struct cannot fail")
    }

    /// Verify signature and expiry only. Does not check the user is active;
    /// callers combine this with a repository lookup (see `authenticate`).
    pub fn decode(&self, token: &str) -> Result<AccessTokenClaims, VerifyError> {
        let mut validation = Validation::default();
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.set_issuer(&[AccessTokenClaims::ISSUER]);

        let data = decode::<AccessTokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => VerifyError::Expired,
            _ => VerifyError::Invalid,
        })?;

        Ok(data.claims)
    }
}

/// Outcome of a full authentication attempt against a user store, matching
/// the two failure kinds named in spec §4.A: `Unauthenticated` for a
/// missing/invalid/expired token, `Forbidden` for an inactive user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(ResolvedIdentity),
    Unauthenticated,
    Forbidden,
}

/// Resolve a token all the way to an authorization decision, given the
/// caller's view of whether the claimed user is still active. The verifier
/// itself never touches storage — this keeps it dependency-free and testable
/// without a database.
pub fn authenticate(
    verifier: &TokenVerifier,
    token: &str,
    is_user_active: impl FnOnce(&str) -> Option<bool>,
) -> AuthOutcome {
    let claims = match verifier.decode(token) {
        Ok(c) => c,
        Err(_) => return AuthOutcome::Unauthenticated,
    };
    match is_user_active(&claims.sub) {
        Some(true) => AuthOutcome::Authenticated(ResolvedIdentity {
            user_id: claims.sub,
            username: claims.username,
            is_guest: claims.is_guest,
        }),
        Some(false) => AuthOutcome::Forbidden,
        None => AuthOutcome::Unauthenticated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_decodes_back_to_same_identity() {
        let verifier = TokenVerifier::new("test-secret");
        let token = verifier.issue("user-1", "alice", false);
        let claims = verifier.decode(&token).expect("should decode");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "alice");
        assert!(!claims.is_guest);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let verifier = TokenVerifier::new("secret-a");
        let token = verifier.issue("user-1", "alice", false);
        let other = TokenVerifier::new("secret-b");
        assert_eq!(other.decode(&token), Err(VerifyError::Invalid));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let verifier = TokenVerifier::new("test-secret");
        assert_eq!(verifier.decode("not-a-jwt"), Err(VerifyError::Invalid));
    }

    #[test]
    fn authenticate_maps_inactive_user_to_forbidden() {
        let verifier = TokenVerifier::new("test-secret");
        let token = verifier.issue("user-1", "alice", false);
        let outcome = authenticate(&verifier, &token, |_| Some(false));
        assert_eq!(outcome, AuthOutcome::Forbidden);
    }

    #[test]
    fn authenticate_maps_unknown_user_to_unauthenticated() {
        let verifier = TokenVerifier::new("test-secret");
        let token = verifier.issue("user-1", "alice", false);
        let outcome = authenticate(&verifier, &token, |_| None);
        assert_eq!(outcome, AuthOutcome::Unauthenticated);
    }

    #[test]
    fn authenticate_succeeds_for_active_user() {
        let verifier = TokenVerifier::new("test-secret");
        let token = verifier.issue("user-1", "alice", false);
        let outcome = authenticate(&verifier, &token, |_| Some(true));
        match outcome {
            AuthOutcome::Authenticated(id) => assert_eq!(id.user_id, "user-1"),
            other => panic!("expected Authenticated, got {other:?}"),
        }
    }

    #[test]
    fn bad_token_never_reaches_the_lookup() {
        let verifier = TokenVerifier::new("test-secret");
        let outcome = authenticate(&verifier, "garbage", |_| {
            panic!("lookup should not run for an invalid token")
        });
        assert_eq!(outcome, AuthOutcome::Unauthenticated);
    }
}
