//! Signature Version 4 request signing.
//!
//! Produces the `Authorization` header the reservation backend verifies:
//! canonical request, string to sign, then a signature keyed by material
//! derived from the temporary credentials. The signer is pure; callers decide
//! whether credentials exist before invoking it.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::session::AwsCredentials;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Outbound request before signing. `query` and `headers` are unordered;
/// canonicalization sorts them.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: String,
    pub protocol: String,
    pub host: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// The same request with authorization material injected. Method and body
/// pass through untouched; the URL carries the canonical query so it matches
/// what was signed.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Sign a request with the current time.
pub fn sign(
    request: &RequestDescriptor,
    credentials: &AwsCredentials,
    region: &str,
    service: &str,
) -> SignedRequest {
    sign_at(request, credentials, region, service, Utc::now())
}

/// Sign a request at an explicit timestamp. Deterministic: the same request,
/// credentials, and timestamp always yield the same signature.
pub fn sign_at(
    request: &RequestDescriptor,
    credentials: &AwsCredentials,
    region: &str,
    service: &str,
    now: DateTime<Utc>,
) -> SignedRequest {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let datestamp = now.format("%Y%m%d").to_string();

    let mut headers: Vec<(String, String)> = Vec::new();
    headers.push(("host".to_string(), request.host.clone()));
    for (name, value) in &request.headers {
        headers.push((name.to_lowercase(), normalize_header_value(value)));
    }
    headers.push(("x-amz-date".to_string(), amz_date.clone()));
    // Anonymous identity-pool credentials can carry an empty token; it must
    // not be signed then (and the AWS test vectors assume its absence).
    if !credentials.session_token.is_empty() {
        headers.push((
            "x-amz-security-token".to_string(),
            credentials.session_token.clone(),
        ));
    }
    headers.sort();

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_query = canonical_query_string(&request.query);
    let payload_hash = sha256_hex(request.body.as_deref().unwrap_or("").as_bytes());

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        canonical_uri(&request.path),
        canonical_query,
        canonical_headers,
        signed_headers,
        payload_hash
    );

    let scope = format!("{}/{}/{}/aws4_request", datestamp, region, service);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(&credentials.secret_access_key, &datestamp, region, service);
    let signature = hex_encode(&hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, credentials.access_key_id, scope, signed_headers, signature
    );

    let mut out_headers = headers;
    out_headers.push(("authorization".to_string(), authorization));

    let url = if canonical_query.is_empty() {
        format!("{}://{}{}", request.protocol, request.host, request.path)
    } else {
        format!(
            "{}://{}{}?{}",
            request.protocol, request.host, request.path, canonical_query
        )
    };

    SignedRequest {
        method: request.method.clone(),
        url,
        headers: out_headers,
        body: request.body.clone(),
    }
}

/// Key derivation chain: AWS4+secret -> date -> region -> service -> aws4_request.
fn derive_signing_key(secret: &str, datestamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), datestamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Percent-encode each path segment, keeping the separators.
fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Encoded pairs sorted by key then value, joined as a query string.
fn canonical_query_string(query: &[(String, String)]) -> String {
    let mut pairs: Vec<(String, String)> = query
        .iter()
        .map(|(key, value)| {
            (
                urlencoding::encode(key).into_owned(),
                urlencoding::encode(value).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// Trim and collapse runs of spaces, as canonicalization requires.
fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(data: &[u8]) -> String {
    hex_encode(&Sha256::digest(data))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
