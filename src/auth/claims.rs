use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Token payload; `sid` ties the token to a server-side session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub sid: Uuid,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        session_id: Uuid,
        kind: TokenKind,
        issued_at: OffsetDateTime,
        ttl: Duration,
        issuer: &str,
        audience: &str,
    ) -> Self {
        Self {
            sub: user_id,
            sid: session_id,
            iat: issued_at.unix_timestamp() as usize,
            exp: (issued_at + ttl).unix_timestamp() as usize,
            iss: issuer.to_owned(),
            aud: audience.to_owned(),
            kind,
        }
    }
}
