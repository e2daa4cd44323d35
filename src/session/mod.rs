use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod gate;
pub mod store;

pub use gate::{RefreshGate, RefreshPermit};
pub use store::SessionStore;

#[cfg(test)]
mod tests;

/// Identity session issued by the user pool.
///
/// `expires_in` is the provider's stated token lifetime in seconds. It sizes
/// the stored records but plays no part in refresh decisions; those key off
/// the temporary credentials' `expiration`.
#[derive(Debug, Clone, PartialEq)]
pub struct CognitoTokens {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Temporary AWS credentials from the identity pool.
///
/// Serialized form matches the provider's field casing so the persisted
/// record is interchangeable with what the identity pool hands out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    /// Authoritative expiry. The refresh decision is based on this field.
    pub expiration: DateTime<Utc>,
}

/// Refresh-grant result: a partial identity session.
///
/// The provider does not rotate refresh tokens, so the refresh response
/// carries no new one. Callers rebuild a full [`CognitoTokens`] by
/// re-attaching the original refresh token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRefresh {
    pub id_token: String,
    pub access_token: String,
    pub expires_in: i64,
}

impl TokenRefresh {
    /// Rebuild a full identity session, carrying over the refresh token
    /// from the previous session.
    pub fn with_refresh_token(self, refresh_token: String) -> CognitoTokens {
        CognitoTokens {
            id_token: self.id_token,
            access_token: self.access_token,
            refresh_token,
            expires_in: self.expires_in,
        }
    }
}

/// A complete authenticated session. Only ever constructed whole: loading
/// yields either all three parts validated or nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub credentials: AwsCredentials,
    pub tokens: CognitoTokens,
    /// Opaque identity pool reference, reused on refresh so the identity
    /// lookup is not repeated.
    pub identity_id: String,
}

impl Session {
    /// Strict comparison: a session expiring exactly at `now` is not yet
    /// expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.credentials.expiration
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
