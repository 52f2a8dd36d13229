use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CredentialError, CredentialStore};
use crate::models::Role;

/// Claims carried in the access token payload.
///
/// Read locally for routing decisions only; the server remains the
/// authority on whether the token is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthData {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl AuthData {
    /// Decode the payload segment of a JWT without verifying the signature.
    pub fn decode(token: &str) -> Option<Self> {
        let mut parts = token.split('.');
        let (_header, payload) = (parts.next()?, parts.next()?);
        parts.next()?;

        // Some issuers keep base64 padding; the URL-safe engine rejects it.
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp < now.timestamp()
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at() - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }

    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }

    /// Case-insensitive role check.
    pub fn has_role(&self, role: &str) -> bool {
        self.role.eq_ignore_ascii_case(role)
    }

    /// Landing path for this user's role.
    pub fn home_path(&self) -> &'static str {
        self.role().home_path()
    }
}

/// Claims of the stored token, or `None` when there is no usable token.
///
/// An expired token is removed from the store. A token that cannot be
/// decoded is left in place and reported as absent.
pub fn current_auth(store: &dyn CredentialStore) -> Result<Option<AuthData>, CredentialError> {
    let Some(token) = store.access_token()? else {
        return Ok(None);
    };

    match AuthData::decode(&token) {
        Some(data) if data.is_expired() => {
            debug!(sub = %data.sub, "Stored token has expired, removing it");
            store.remove_access_token()?;
            Ok(None)
        }
        Some(data) => Ok(Some(data)),
        None => {
            debug!("Stored token could not be decoded");
            Ok(None)
        }
    }
}

#[cfg(test)]
pub(crate) fn make_token(role: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({
            "sub": "emp-001",
            "email": "sari@dexagroup.com",
            "role": role,
            "iat": exp - 900,
            "exp": exp,
        })
        .to_string(),
    );
    format!("{}.{}.signature", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryCredentialStore;

    #[test]
    fn test_decode_valid_token() {
        let exp = Utc::now().timestamp() + 600;
        let data = AuthData::decode(&make_token("Admin", exp)).unwrap();
        assert_eq!(data.sub, "emp-001");
        assert_eq!(data.email, "sari@dexagroup.com");
        assert_eq!(data.exp, exp);
        assert!(!data.is_expired());
        assert!(data.has_role("admin"));
        assert!(!data.has_role("employee"));
        assert_eq!(data.home_path(), "/admin");
        assert!(data.minutes_until_expiry() >= 9);
    }

    #[test]
    fn test_decode_rejects_malformed_tokens() {
        assert!(AuthData::decode("").is_none());
        assert!(AuthData::decode("onlyonepart").is_none());
        assert!(AuthData::decode("a.b").is_none());
        assert!(AuthData::decode("a.!!!.c").is_none());
        let not_claims = format!("x.{}.y", URL_SAFE_NO_PAD.encode("{\"foo\":1}"));
        assert!(AuthData::decode(&not_claims).is_none());
    }

    #[test]
    fn test_expiry_boundary() {
        let data = AuthData::decode(&make_token("employee", 1_700_000_000)).unwrap();
        let at = |ts| Utc.timestamp_opt(ts, 0).unwrap();
        assert!(!data.is_expired_at(at(1_700_000_000)));
        assert!(data.is_expired_at(at(1_700_000_001)));
        assert_eq!(data.home_path(), "/employee");
    }

    #[test]
    fn test_current_auth_removes_expired_token() {
        let store = MemoryCredentialStore::new();
        store.set_push_token("fcm").unwrap();
        store
            .set_access_token(&make_token("employee", Utc::now().timestamp() - 60))
            .unwrap();

        assert_eq!(current_auth(&store).unwrap(), None);
        assert_eq!(store.access_token().unwrap(), None);
        // only the token is dropped
        assert_eq!(store.push_token().unwrap().as_deref(), Some("fcm"));
    }

    #[test]
    fn test_current_auth_keeps_valid_and_undecodable_tokens() {
        let store = MemoryCredentialStore::new();
        assert_eq!(current_auth(&store).unwrap(), None);

        let token = make_token("employee", Utc::now().timestamp() + 600);
        store.set_access_token(&token).unwrap();
        assert_eq!(current_auth(&store).unwrap().unwrap().sub, "emp-001");

        store.set_access_token("opaque").unwrap();
        assert_eq!(current_auth(&store).unwrap(), None);
        assert_eq!(store.access_token().unwrap().as_deref(), Some("opaque"));
    }
}
