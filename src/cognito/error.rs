use serde::Deserialize;

/// Provider error identifiers mapped to local kinds.
///
/// The wire `__type` may be namespace-qualified
/// (`com.amazonaws.cognito...#UsernameExistsException`); classification uses
/// the bare name. Anything unrecognized lands in `Other` with the raw name
/// preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderErrorKind {
    UsernameExists,
    InvalidPassword,
    NotAuthorized,
    UserNotFound,
    UserNotConfirmed,
    InvalidParameter,
    TooManyRequests,
    ResourceNotFound,
    Other(String),
}

impl ProviderErrorKind {
    pub fn from_wire(error_type: &str) -> Self {
        let name = error_type
            .rsplit_once('#')
            .map(|(_, name)| name)
            .unwrap_or(error_type);
        match name {
            "UsernameExistsException" => Self::UsernameExists,
            "InvalidPasswordException" => Self::InvalidPassword,
            "NotAuthorizedException" => Self::NotAuthorized,
            "UserNotFoundException" => Self::UserNotFound,
            "UserNotConfirmedException" => Self::UserNotConfirmed,
            "InvalidParameterException" => Self::InvalidParameter,
            "TooManyRequestsException" => Self::TooManyRequests,
            "ResourceNotFoundException" => Self::ResourceNotFound,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A normalized provider failure: classified kind for branching, raw type and
/// message for logs and the diagnostic fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub raw_type: String,
    pub message: String,
}

impl ProviderError {
    pub fn transport(message: String) -> Self {
        Self {
            kind: ProviderErrorKind::Other("TransportError".to_string()),
            raw_type: "TransportError".to_string(),
            message,
        }
    }

    pub fn not_configured() -> Self {
        Self {
            kind: ProviderErrorKind::Other("NotConfigured".to_string()),
            raw_type: "NotConfigured".to_string(),
            message: "provider endpoint or client id missing".to_string(),
        }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.raw_type, self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Error body shape of the provider's JSON protocol.
#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// Classify a non-success response body. Unparseable bodies become `Other`
/// with the raw body kept for diagnostics.
pub(crate) fn classify(body: &str) -> ProviderError {
    match serde_json::from_str::<WireError>(body) {
        Ok(wire) => {
            let raw_type = wire.error_type.unwrap_or_else(|| "UnknownError".to_string());
            ProviderError {
                kind: ProviderErrorKind::from_wire(&raw_type),
                raw_type,
                message: wire.message.unwrap_or_default(),
            }
        }
        Err(_) => ProviderError {
            kind: ProviderErrorKind::Other("UnknownError".to_string()),
            raw_type: "UnknownError".to_string(),
            message: body.to_string(),
        },
    }
}
