//! Login session: the bearer token plus the claims the UI cares about.
//!
//! The token payload is decoded only to pick the role and expiry for
//! navigation. The signature is not verified here; the backend does that
//! on every request.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::role_gate::Role;

#[derive(Debug, Default, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// An authenticated session.
#[derive(Clone)]
pub struct Session {
    token: String,
    subject: Option<String>,
    role: Option<Role>,
    expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("subject", &self.subject)
            .field("role", &self.role)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Session {
    /// Build a session from a raw JWT. Never fails: a token whose payload
    /// cannot be read yields a session without role or expiry.
    pub fn from_token(token: impl Into<String>) -> Self {
        let token = token.into();
        let claims = decode_claims(&token).unwrap_or_default();

        Self {
            subject: claims.sub,
            role: Role::parse(claims.role.as_deref()),
            expires_at: claims.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single()),
            token,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Tokens without an `exp` claim are treated as not expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// Role to gate navigation with: none once the token has expired.
    pub fn effective_role(&self, now: DateTime<Utc>) -> Option<Role> {
        if self.is_expired(now) { None } else { self.role }
    }
}

fn decode_claims(token: &str) -> Option<Claims> {
    let payload = token.split('.').nth(1)?;
    // Some issuers pad their segments even though JWT says not to.
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}
