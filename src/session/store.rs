use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::{Duration, OffsetDateTime};

use super::{AwsCredentials, CognitoTokens, Session};

/// Temporary credentials: one JSON record, expiring when the credentials do.
const AWS_CREDS_COOKIE: &str = "aws_creds";

/// Identity session: one record per field, written and removed as a group.
/// The shared "cognito." prefix marks them as such.
const ID_TOKEN_COOKIE: &str = "cognito.IdToken";
const ACCESS_TOKEN_COOKIE: &str = "cognito.AccessToken";
const REFRESH_TOKEN_COOKIE: &str = "cognito.RefreshToken";
const EXPIRES_IN_COOKIE: &str = "cognito.ExpiresIn";

const IDENTITY_ID_COOKIE: &str = "identity_id";
const IDENTITY_ID_TTL_SECONDS: i64 = 3600;

/// Persists the session as HttpOnly cookies on the client.
///
/// Loading is fail-closed: unless every record of all three parts is present
/// and well formed, there is no session. Saving always writes the full set,
/// so a reader can never observe a half-written session across requests.
#[derive(Debug, Clone)]
pub struct SessionStore {
    /// Marks cookies Secure. Off in dev so plain-HTTP localhost works.
    secure: bool,
}

impl SessionStore {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Read and validate the full session from the request cookies.
    pub fn load(&self, jar: &CookieJar) -> Option<Session> {
        let credentials: AwsCredentials =
            serde_json::from_str(jar.get(AWS_CREDS_COOKIE)?.value()).ok()?;
        let tokens = load_identity_session(jar)?;
        let identity_id = jar.get(IDENTITY_ID_COOKIE)?.value().to_string();

        Some(Session {
            credentials,
            tokens,
            identity_id,
        })
    }

    /// Write all records of the session. Returning the jar from a handler or
    /// middleware emits the Set-Cookie headers.
    pub fn save(&self, jar: CookieJar, session: &Session) -> CookieJar {
        let jar = jar.add(self.credentials_cookie(&session.credentials));
        let jar = self.save_identity_session(jar, &session.tokens);
        jar.add(self.record(
            IDENTITY_ID_COOKIE.to_string(),
            session.identity_id.clone(),
            Duration::seconds(IDENTITY_ID_TTL_SECONDS),
        ))
    }

    /// Remove every cookie present, not just the known names, so legacy or
    /// residual records cannot survive a sign-out.
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        let names: Vec<String> = jar.iter().map(|c| c.name().to_string()).collect();
        names.into_iter().fold(jar, |jar, name| {
            jar.add(
                Cookie::build((name, ""))
                    .path("/".to_string())
                    .max_age(Duration::ZERO)
                    .build(),
            )
        })
    }

    fn credentials_cookie(&self, credentials: &AwsCredentials) -> Cookie<'static> {
        let json = serde_json::to_string(credentials).expect("credentials serialize");
        Cookie::build((AWS_CREDS_COOKIE, json))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/".to_string())
            .expires(expires_at(credentials))
            .build()
    }

    fn save_identity_session(&self, jar: CookieJar, tokens: &CognitoTokens) -> CookieJar {
        let ttl = Duration::seconds(tokens.expires_in);
        identity_session_records(tokens)
            .into_iter()
            .fold(jar, |jar, (name, value)| {
                jar.add(self.record(name.to_string(), value, ttl))
            })
    }

    fn record(&self, name: String, value: String, ttl: Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/".to_string())
            .max_age(ttl)
            .build()
    }
}

fn load_identity_session(jar: &CookieJar) -> Option<CognitoTokens> {
    let expires_in: i64 = jar.get(EXPIRES_IN_COOKIE)?.value().parse().ok()?;
    Some(CognitoTokens {
        id_token: jar.get(ID_TOKEN_COOKIE)?.value().to_string(),
        access_token: jar.get(ACCESS_TOKEN_COOKIE)?.value().to_string(),
        refresh_token: jar.get(REFRESH_TOKEN_COOKIE)?.value().to_string(),
        expires_in,
    })
}

fn identity_session_records(tokens: &CognitoTokens) -> [(&'static str, String); 4] {
    [
        (ID_TOKEN_COOKIE, tokens.id_token.clone()),
        (ACCESS_TOKEN_COOKIE, tokens.access_token.clone()),
        (REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone()),
        (EXPIRES_IN_COOKIE, tokens.expires_in.to_string()),
    ]
}

/// Cookie expiry for the credentials record. Out-of-range timestamps collapse
/// to the epoch, which the client treats as already expired.
fn expires_at(credentials: &AwsCredentials) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(credentials.expiration.timestamp())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Names of all records a full session writes, in write order.
pub fn session_record_names() -> [&'static str; 6] {
    [
        AWS_CREDS_COOKIE,
        ID_TOKEN_COOKIE,
        ACCESS_TOKEN_COOKIE,
        REFRESH_TOKEN_COOKIE,
        EXPIRES_IN_COOKIE,
        IDENTITY_ID_COOKIE,
    ]
}
