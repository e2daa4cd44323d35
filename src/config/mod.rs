use serde::Deserialize;

/// Complete Courtside configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CourtsideConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cognito: CognitoConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// "dev" or "prod". Prod switches session cookies to Secure.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Browser origin allowed to make credentialed requests. When unset
    /// the server mirrors the request origin, which is only suitable for dev.
    #[serde(default)]
    pub frontend_origin: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

impl ServerConfig {
    pub fn is_prod(&self) -> bool {
        self.environment == "prod"
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            environment: default_environment(),
            frontend_origin: None,
        }
    }
}

/// Cognito user pool and identity pool configuration.
///
/// All identifiers are optional: any provider operation that needs a missing
/// value fails closed instead of guessing. The app client secret is never read
/// from the config file, only from `COURTSIDE_COGNITO_CLIENT_SECRET`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CognitoConfig {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub user_pool_id: Option<String>,
    #[serde(default)]
    pub app_client_id: Option<String>,
    #[serde(default)]
    pub identity_pool_id: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    /// Endpoint overrides for local stacks and tests. When unset, endpoints
    /// derive from `region`.
    #[serde(default)]
    pub idp_endpoint: Option<String>,
    #[serde(default)]
    pub identity_endpoint: Option<String>,
    #[serde(skip)]
    pub client_secret: Option<String>,
}

impl CognitoConfig {
    /// User pool endpoint (InitiateAuth, SignUp).
    pub fn idp_endpoint(&self) -> Option<String> {
        if let Some(url) = &self.idp_endpoint {
            return Some(url.clone());
        }
        self.region
            .as_ref()
            .map(|r| format!("https://cognito-idp.{}.amazonaws.com/", r))
    }

    /// Identity pool endpoint (GetId, GetCredentialsForIdentity).
    pub fn identity_endpoint(&self) -> Option<String> {
        if let Some(url) = &self.identity_endpoint {
            return Some(url.clone());
        }
        self.region
            .as_ref()
            .map(|r| format!("https://cognito-identity.{}.amazonaws.com/", r))
    }

    /// Key for the identity pool Logins map: the user pool issuer without scheme.
    pub fn logins_key(&self) -> Option<String> {
        match (&self.region, &self.user_pool_id) {
            (Some(region), Some(pool)) => {
                Some(format!("cognito-idp.{}.amazonaws.com/{}", region, pool))
            }
            _ => None,
        }
    }
}

/// Reservation backend API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Hostname of the reservation API (no scheme). Unset disables the
    /// court endpoints.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Service name used in the signing scope.
    #[serde(default = "default_service")]
    pub service: String,
}

fn default_protocol() -> String {
    "https".to_string()
}

fn default_service() -> String {
    "execute-api".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: None,
            protocol: default_protocol(),
            service: default_service(),
        }
    }
}

impl Default for CourtsideConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            cognito: CognitoConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl CourtsideConfig {
    /// Apply environment overrides on top of whatever the file provided.
    /// Deployment values and the client secret live in env, config files
    /// carry the rest.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("COURTSIDE_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Ok(v) = std::env::var("COURTSIDE_ENV") {
            self.server.environment = v;
        }
        if let Ok(v) = std::env::var("COURTSIDE_FRONTEND_ORIGIN") {
            self.server.frontend_origin = Some(v);
        }
        if let Ok(v) = std::env::var("COURTSIDE_REGION") {
            self.cognito.region = Some(v);
        }
        if let Ok(v) = std::env::var("COURTSIDE_USER_POOL_ID") {
            self.cognito.user_pool_id = Some(v);
        }
        if let Ok(v) = std::env::var("COURTSIDE_APP_CLIENT_ID") {
            self.cognito.app_client_id = Some(v);
        }
        if let Ok(v) = std::env::var("COURTSIDE_IDENTITY_POOL_ID") {
            self.cognito.identity_pool_id = Some(v);
        }
        if let Ok(v) = std::env::var("COURTSIDE_ACCOUNT_ID") {
            self.cognito.account_id = Some(v);
        }
        if let Ok(v) = std::env::var("COURTSIDE_COGNITO_CLIENT_SECRET") {
            self.cognito.client_secret = Some(v);
        }
        if let Ok(v) = std::env::var("COURTSIDE_BACKEND_HOST") {
            self.backend.host = Some(v);
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<CourtsideConfig, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: CourtsideConfig = toml::from_str(&contents)?;
    Ok(config)
}
