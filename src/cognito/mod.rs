//! Token exchange client for the identity provider.
//!
//! Speaks the provider's JSON protocol (POST to a regional endpoint with an
//! `X-Amz-Target` operation header) against two services: the user pool
//! (authenticate, refresh, sign-up) and the identity pool (identity lookup,
//! temporary credential issuance). Every operation normalizes transport
//! failures, provider rejections, and malformed responses to an absence; only
//! sign-up surfaces the classified error, because its caller branches on it.

pub mod claims;
pub mod error;

pub use error::{ProviderError, ProviderErrorKind};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::config::CognitoConfig;
use crate::session::{AwsCredentials, CognitoTokens, TokenRefresh};

type HmacSha256 = Hmac<Sha256>;

const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

const TARGET_INITIATE_AUTH: &str = "AWSCognitoIdentityProviderService.InitiateAuth";
const TARGET_SIGN_UP: &str = "AWSCognitoIdentityProviderService.SignUp";
const TARGET_GET_ID: &str = "AWSCognitoIdentityService.GetId";
const TARGET_GET_CREDENTIALS: &str = "AWSCognitoIdentityService.GetCredentialsForIdentity";

/// Result of the identity-pool exchange: credentials plus the identity
/// reference they are scoped to.
#[derive(Debug, Clone)]
pub struct IdentityCredentials {
    pub credentials: AwsCredentials,
    pub identity_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignUpConfirmation {
    pub user_confirmed: bool,
}

/// Registration failure, split so the action layer can tell "we could not
/// even build the request" from "the provider said no".
#[derive(Debug)]
pub enum SignUpError {
    /// App client id or secret missing; no secret hash can be computed.
    MissingSecretHash,
    Provider(ProviderError),
}

impl std::fmt::Display for SignUpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignUpError::MissingSecretHash => write!(f, "secret hash not computable"),
            SignUpError::Provider(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SignUpError {}

/// Client for both provider services. Cheap to clone; the underlying HTTP
/// client is shared.
#[derive(Debug, Clone)]
pub struct CognitoClient {
    http: reqwest::Client,
    config: CognitoConfig,
}

impl CognitoClient {
    pub fn new(config: CognitoConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Password-grant authentication. Fails closed unless the response
    /// carries all four token fields.
    pub async fn authenticate(&self, email: &str, password: &str) -> Option<CognitoTokens> {
        let (endpoint, client_id) = self.user_pool_config()?;
        let secret_hash = self.secret_hash(email)?;

        let body = json!({
            "AuthFlow": "USER_PASSWORD_AUTH",
            "ClientId": client_id,
            "AuthParameters": {
                "USERNAME": email,
                "PASSWORD": password,
                "SECRET_HASH": secret_hash,
            },
        });

        let text = match self.call(&endpoint, TARGET_INITIATE_AUTH, body).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "authentication failed");
                return None;
            }
        };

        let response: InitiateAuthResponse = serde_json::from_str(&text).ok()?;
        let auth = response.authentication_result?;
        Some(CognitoTokens {
            id_token: auth.id_token?,
            access_token: auth.access_token?,
            refresh_token: auth.refresh_token?,
            expires_in: auth.expires_in?,
        })
    }

    /// Refresh-token grant. Returns a session fragment without a refresh
    /// token; the provider does not rotate them, so the caller re-attaches
    /// the original.
    ///
    /// The secret hash for this flow is keyed by the pool username, which is
    /// recovered from the current id token's claims.
    pub async fn refresh(&self, id_token: &str, refresh_token: &str) -> Option<TokenRefresh> {
        let (endpoint, client_id) = self.user_pool_config()?;
        let token_claims = claims::parse_unverified(id_token)?;
        let username = token_claims.preferred_username()?;
        let secret_hash = self.secret_hash(username)?;

        let body = json!({
            "AuthFlow": "REFRESH_TOKEN_AUTH",
            "ClientId": client_id,
            "AuthParameters": {
                "REFRESH_TOKEN": refresh_token,
                "SECRET_HASH": secret_hash,
            },
        });

        let text = match self.call(&endpoint, TARGET_INITIATE_AUTH, body).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                return None;
            }
        };

        let response: InitiateAuthResponse = serde_json::from_str(&text).ok()?;
        let auth = response.authentication_result?;
        Some(TokenRefresh {
            id_token: auth.id_token?,
            access_token: auth.access_token?,
            expires_in: auth.expires_in?,
        })
    }

    /// Exchange an id token for temporary credentials.
    ///
    /// When `identity_id` is already known it is reused and the identity
    /// lookup round trip is skipped. Requires region, account id, identity
    /// pool id, and user pool id to all be configured.
    pub async fn exchange_for_credentials(
        &self,
        id_token: &str,
        identity_id: Option<&str>,
    ) -> Option<IdentityCredentials> {
        let pool = self.identity_pool_config()?;

        let identity_id = match identity_id {
            Some(id) => id.to_string(),
            None => self.lookup_identity_id(&pool, id_token).await?,
        };

        let body = json!({
            "IdentityId": identity_id,
            "Logins": logins_map(&pool.logins_key, id_token),
        });

        let text = match self.call(&pool.endpoint, TARGET_GET_CREDENTIALS, body).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "credential exchange failed");
                return None;
            }
        };

        let response: GetCredentialsResponse = serde_json::from_str(&text).ok()?;
        let creds = response.credentials?;
        let expiration = epoch_seconds_to_datetime(creds.expiration?)?;

        Some(IdentityCredentials {
            identity_id: response.identity_id.unwrap_or(identity_id),
            credentials: AwsCredentials {
                access_key_id: creds.access_key_id?,
                secret_access_key: creds.secret_key?,
                session_token: creds.session_token?,
                expiration,
            },
        })
    }

    /// Register a new user. The account creation date is recorded in a
    /// custom attribute.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignUpConfirmation, SignUpError> {
        let secret_hash = self.secret_hash(email).ok_or(SignUpError::MissingSecretHash)?;
        let (endpoint, client_id) = self
            .user_pool_config()
            .ok_or_else(|| SignUpError::Provider(ProviderError::not_configured()))?;

        let body = json!({
            "ClientId": client_id,
            "Username": email,
            "Password": password,
            "SecretHash": secret_hash,
            "UserAttributes": [
                { "Name": "custom:joinedOn", "Value": current_date() }
            ],
        });

        let text = self
            .call(&endpoint, TARGET_SIGN_UP, body)
            .await
            .map_err(SignUpError::Provider)?;

        let response: SignUpResponse = serde_json::from_str(&text).unwrap_or_default();
        Ok(SignUpConfirmation {
            user_confirmed: response.user_confirmed.unwrap_or(false),
        })
    }

    /// GetId: derive the identity reference for an id token.
    async fn lookup_identity_id(&self, pool: &IdentityPoolConfig, id_token: &str) -> Option<String> {
        let body = json!({
            "AccountId": pool.account_id,
            "IdentityPoolId": pool.identity_pool_id,
            "Logins": logins_map(&pool.logins_key, id_token),
        });

        let text = match self.call(&pool.endpoint, TARGET_GET_ID, body).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "identity lookup failed");
                return None;
            }
        };

        let response: GetIdResponse = serde_json::from_str(&text).ok()?;
        response.identity_id
    }

    /// One provider operation in the JSON protocol framing.
    async fn call(
        &self,
        endpoint: &str,
        target: &str,
        body: serde_json::Value,
    ) -> Result<String, ProviderError> {
        debug!(target = target, "calling identity provider");

        let response = self
            .http
            .post(endpoint)
            .header("Content-Type", JSON_CONTENT_TYPE)
            .header("X-Amz-Target", target)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| ProviderError::transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::transport(e.to_string()))?;

        if !status.is_success() {
            return Err(error::classify(&text));
        }
        Ok(text)
    }

    /// Proof of client identity the provider requires alongside user
    /// credentials: HMAC-SHA256 over username + client id, keyed by the app
    /// client secret, base64-encoded.
    fn secret_hash(&self, username: &str) -> Option<String> {
        let client_id = self.config.app_client_id.as_deref()?;
        let secret = self.config.client_secret.as_deref()?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(username.as_bytes());
        mac.update(client_id.as_bytes());
        Some(BASE64.encode(mac.finalize().into_bytes()))
    }

    fn user_pool_config(&self) -> Option<(String, String)> {
        match (self.config.idp_endpoint(), self.config.app_client_id.clone()) {
            (Some(endpoint), Some(client_id)) => Some((endpoint, client_id)),
            _ => {
                warn!("user pool not configured; failing closed");
                None
            }
        }
    }

    fn identity_pool_config(&self) -> Option<IdentityPoolConfig> {
        let endpoint = self.config.identity_endpoint();
        let logins_key = self.config.logins_key();
        let identity_pool_id = self.config.identity_pool_id.clone();
        let account_id = self.config.account_id.clone();
        match (endpoint, logins_key, identity_pool_id, account_id) {
            (Some(endpoint), Some(logins_key), Some(identity_pool_id), Some(account_id)) => {
                Some(IdentityPoolConfig {
                    endpoint,
                    logins_key,
                    identity_pool_id,
                    account_id,
                })
            }
            _ => {
                warn!("identity pool not configured; failing closed");
                None
            }
        }
    }
}

struct IdentityPoolConfig {
    endpoint: String,
    logins_key: String,
    identity_pool_id: String,
    account_id: String,
}

fn logins_map(logins_key: &str, id_token: &str) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(logins_key.to_string(), json!(id_token));
    serde_json::Value::Object(map)
}

/// Current UTC date as YYYY-MM-DD, for the joined-on attribute.
fn current_date() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// The identity pool reports expiry as fractional seconds since the epoch.
fn epoch_seconds_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    let secs = seconds.trunc() as i64;
    let nanos = (seconds.fract() * 1_000_000_000.0) as u32;
    DateTime::from_timestamp(secs, nanos)
}

#[derive(Debug, Deserialize)]
struct InitiateAuthResponse {
    #[serde(rename = "AuthenticationResult")]
    authentication_result: Option<AuthenticationResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetIdResponse {
    #[serde(default)]
    identity_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetCredentialsResponse {
    #[serde(default)]
    identity_id: Option<String>,
    #[serde(default)]
    credentials: Option<ProviderCredentials>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProviderCredentials {
    #[serde(default)]
    access_key_id: Option<String>,
    #[serde(default)]
    secret_key: Option<String>,
    #[serde(default)]
    session_token: Option<String>,
    #[serde(default)]
    expiration: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpResponse {
    #[serde(default)]
    user_confirmed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn configured_client() -> CognitoClient {
        CognitoClient::new(CognitoConfig {
            region: Some("us-east-2".to_string()),
            user_pool_id: Some("us-east-2_AbCdEfGhI".to_string()),
            app_client_id: Some("4example1234".to_string()),
            identity_pool_id: Some(
                "us-east-2:11111111-2222-3333-4444-555555555555".to_string(),
            ),
            account_id: Some("123456789012".to_string()),
            idp_endpoint: None,
            identity_endpoint: None,
            client_secret: Some("app-client-secret".to_string()),
        })
    }

    #[test]
    fn test_secret_hash_known_answer() {
        // HMAC-SHA256(key="secret", msg="username"+"client-id"), base64
        let client = CognitoClient::new(CognitoConfig {
            app_client_id: Some("client-id".to_string()),
            client_secret: Some("secret".to_string()),
            ..Default::default()
        });

        let hash = client.secret_hash("username").expect("hash should compute");
        assert_eq!(hash, "0OVo7qIXCrrmdQ5sMOwm1MRxKnbqZ7R1NRdpn3foYKc=");
    }

    #[test]
    fn test_secret_hash_requires_secret() {
        let client = CognitoClient::new(CognitoConfig {
            app_client_id: Some("client-id".to_string()),
            ..Default::default()
        });
        assert!(client.secret_hash("username").is_none());
    }

    #[test]
    fn test_auth_response_deserialization() {
        let json = r#"{
            "AuthenticationResult": {
                "AccessToken": "access-token",
                "ExpiresIn": 3600,
                "IdToken": "id-token",
                "RefreshToken": "refresh-token",
                "TokenType": "Bearer"
            },
            "ChallengeParameters": {}
        }"#;

        let response: InitiateAuthResponse = serde_json::from_str(json).unwrap();
        let auth = response.authentication_result.unwrap();
        assert_eq!(auth.id_token.as_deref(), Some("id-token"));
        assert_eq!(auth.refresh_token.as_deref(), Some("refresh-token"));
        assert_eq!(auth.expires_in, Some(3600));
    }

    #[test]
    fn test_refresh_response_has_no_refresh_token() {
        // The refresh grant omits RefreshToken entirely
        let json = r#"{
            "AuthenticationResult": {
                "AccessToken": "new-access",
                "ExpiresIn": 3600,
                "IdToken": "new-id",
                "TokenType": "Bearer"
            }
        }"#;

        let response: InitiateAuthResponse = serde_json::from_str(json).unwrap();
        let auth = response.authentication_result.unwrap();
        assert_eq!(auth.refresh_token, None);
        assert_eq!(auth.id_token.as_deref(), Some("new-id"));
    }

    #[test]
    fn test_credentials_response_deserialization() {
        let json = r#"{
            "Credentials": {
                "AccessKeyId": "ASIAEXAMPLE",
                "Expiration": 1718881516.0,
                "SecretKey": "secret-key",
                "SessionToken": "session-token"
            },
            "IdentityId": "us-east-2:1111"
        }"#;

        let response: GetCredentialsResponse = serde_json::from_str(json).unwrap();
        let creds = response.credentials.unwrap();
        assert_eq!(creds.access_key_id.as_deref(), Some("ASIAEXAMPLE"));
        assert_eq!(creds.secret_key.as_deref(), Some("secret-key"));
        assert_eq!(creds.expiration, Some(1718881516.0));
        assert_eq!(response.identity_id.as_deref(), Some("us-east-2:1111"));
    }

    #[test]
    fn test_epoch_seconds_conversion() {
        let expiration = epoch_seconds_to_datetime(1718881516.0).unwrap();
        assert_eq!(
            expiration,
            Utc.with_ymd_and_hms(2024, 6, 20, 11, 5, 16).unwrap()
        );

        // Fractional part survives to subsecond precision
        let fractional = epoch_seconds_to_datetime(1718881516.5).unwrap();
        assert_eq!(fractional.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_current_date_format() {
        let date = current_date();
        assert_eq!(date.len(), 10);
        assert_eq!(date.as_bytes()[4], b'-');
        assert_eq!(date.as_bytes()[7], b'-');
    }

    #[test]
    fn test_logins_map_uses_pool_issuer_key() {
        let client = configured_client();
        let pool = client.identity_pool_config().expect("pool configured");
        assert_eq!(
            pool.logins_key,
            "cognito-idp.us-east-2.amazonaws.com/us-east-2_AbCdEfGhI"
        );

        let map = logins_map(&pool.logins_key, "id-token");
        assert_eq!(
            map["cognito-idp.us-east-2.amazonaws.com/us-east-2_AbCdEfGhI"],
            "id-token"
        );
    }

    #[test]
    fn test_unconfigured_pools_fail_closed() {
        let client = CognitoClient::new(CognitoConfig::default());
        assert!(client.user_pool_config().is_none());
        assert!(client.identity_pool_config().is_none());
    }
}
