//! Bearer token claims (spec §4.A). Grounded on the teacher's
//! `RoomAccessTokenClaims` / session-JWT pattern, generalized to carry a
//! stable user identity instead of a single-room grant.

use serde::{Deserialize, Serialize};

/// JWT payload for the platform's bearer access token. Issued at
/// login/register/guest, accepted on both the HTTP `Authorization: Bearer`
/// header and the socket handshake `auth.token`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessTokenClaims {
    /// Stable user id (not email — emails can change).
    pub sub: String,
    pub username: String,
    pub is_guest: bool,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiration, Unix seconds. Default TTL is 7 days (spec §4.A).
    pub exp: i64,
    pub iss: String,
}

impl AccessTokenClaims {
    pub const ISSUER: &'static str = "meeting-coordination-plane";
    /// Default token lifetime in seconds (`7d`, spec §4.A).
    pub const DEFAULT_TTL_SECS: i64 = 7 * 24 * 60 * 60;
}
