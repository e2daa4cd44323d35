use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

/// Claims read from an id token payload.
///
/// The signature is not checked here: the token only ever arrives from the
/// provider itself or from our own HttpOnly cookie, and these claims drive
/// display and the refresh-grant secret hash, not authorization decisions.
#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenClaims {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "cognito:username", default)]
    pub username: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
}

impl IdTokenClaims {
    /// The user pool username, falling back to the subject id. This is the
    /// value the refresh-grant secret hash must be keyed with.
    pub fn preferred_username(&self) -> Option<&str> {
        self.username.as_deref().or(self.sub.as_deref())
    }
}

/// Decode the payload segment of a JWT without verification.
pub fn parse_unverified(id_token: &str) -> Option<IdTokenClaims> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}
