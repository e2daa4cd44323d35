use super::*;
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, TimeZone, Utc};

fn sample_credentials(expiration: chrono::DateTime<Utc>) -> AwsCredentials {
    AwsCredentials {
        access_key_id: "ASIAEXAMPLEKEYID".to_string(),
        secret_access_key: "secret/Example+Key".to_string(),
        session_token: "FwoGZXIvYXdzEXAMPLETOKEN".to_string(),
        expiration,
    }
}

fn sample_session(expiration: chrono::DateTime<Utc>) -> Session {
    Session {
        credentials: sample_credentials(expiration),
        tokens: CognitoTokens {
            id_token: "header.payload.sig-id".to_string(),
            access_token: "header.payload.sig-access".to_string(),
            refresh_token: "refresh-token-opaque".to_string(),
            expires_in: 3600,
        },
        identity_id: "us-east-2:11111111-2222-3333-4444-555555555555".to_string(),
    }
}

// ---- expiry rule ----

#[test]
fn test_expiry_is_strict() {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let session = sample_session(now);

    // Expiring exactly now is not yet expired
    assert!(!session.is_expired_at(now));
    assert!(session.is_expired_at(now + Duration::seconds(1)));
    assert!(!session.is_expired_at(now - Duration::seconds(1)));
}

#[test]
fn test_refresh_fragment_reattaches_refresh_token() {
    let fragment = TokenRefresh {
        id_token: "new-id".to_string(),
        access_token: "new-access".to_string(),
        expires_in: 3600,
    };

    let tokens = fragment.with_refresh_token("original-refresh".to_string());
    assert_eq!(tokens.id_token, "new-id");
    assert_eq!(tokens.access_token, "new-access");
    assert_eq!(tokens.refresh_token, "original-refresh");
    assert_eq!(tokens.expires_in, 3600);
}

// ---- credential record format ----

#[test]
fn test_credentials_json_field_casing() {
    let expiration = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let json = serde_json::to_string(&sample_credentials(expiration)).unwrap();

    assert!(json.contains("\"AccessKeyId\""));
    assert!(json.contains("\"SecretAccessKey\""));
    assert!(json.contains("\"SessionToken\""));
    assert!(json.contains("\"Expiration\""));
}

#[test]
fn test_credentials_parse_provider_style_json() {
    // Shape the identity pool exchange persists, millisecond timestamp included
    let json = r#"{
        "AccessKeyId": "ASIAEXAMPLEKEYID",
        "SecretAccessKey": "secret/Example+Key",
        "SessionToken": "FwoGZXIvYXdzEXAMPLETOKEN",
        "Expiration": "2025-06-01T12:00:00.000Z"
    }"#;

    let creds: AwsCredentials = serde_json::from_str(json).unwrap();
    assert_eq!(creds.access_key_id, "ASIAEXAMPLEKEYID");
    assert_eq!(
        creds.expiration,
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    );
}

// ---- store round-trip ----

#[test]
fn test_store_round_trip() {
    let store = SessionStore::new(false);
    let expiration = Utc::now() + Duration::hours(1);
    let session = sample_session(expiration);

    let jar = store.save(CookieJar::new(), &session);
    let loaded = store.load(&jar).expect("saved session should load");

    assert_eq!(loaded.tokens, session.tokens);
    assert_eq!(loaded.identity_id, session.identity_id);
    assert_eq!(loaded.credentials.access_key_id, session.credentials.access_key_id);
    assert_eq!(
        loaded.credentials.expiration.timestamp(),
        session.credentials.expiration.timestamp()
    );
}

#[test]
fn test_store_writes_expected_record_names() {
    let store = SessionStore::new(false);
    let jar = store.save(CookieJar::new(), &sample_session(Utc::now()));

    for name in store::session_record_names() {
        assert!(jar.get(name).is_some(), "missing record {}", name);
    }
}

#[test]
fn test_load_empty_jar_is_none() {
    let store = SessionStore::new(false);
    assert!(store.load(&CookieJar::new()).is_none());
}

#[test]
fn test_load_fails_closed_when_any_record_missing() {
    let store = SessionStore::new(false);
    let session = sample_session(Utc::now() + Duration::hours(1));

    // Dropping any single record invalidates the whole session
    for missing in store::session_record_names() {
        let full = store.save(CookieJar::new(), &session);
        let jar = full
            .iter()
            .filter(|c| c.name() != missing)
            .cloned()
            .fold(CookieJar::new(), |jar, c| jar.add(c));

        assert!(
            store.load(&jar).is_none(),
            "load should fail without {}",
            missing
        );
    }
}

#[test]
fn test_load_fails_closed_on_malformed_credentials() {
    let store = SessionStore::new(false);
    let session = sample_session(Utc::now() + Duration::hours(1));

    let jar = store.save(CookieJar::new(), &session);
    let jar = jar.add(axum_extra::extract::cookie::Cookie::new(
        "aws_creds",
        "not-json",
    ));

    assert!(store.load(&jar).is_none());
}

#[test]
fn test_load_fails_closed_on_malformed_expires_in() {
    let store = SessionStore::new(false);
    let session = sample_session(Utc::now() + Duration::hours(1));

    let jar = store.save(CookieJar::new(), &session);
    let jar = jar.add(axum_extra::extract::cookie::Cookie::new(
        "cognito.ExpiresIn",
        "not-a-number",
    ));

    assert!(store.load(&jar).is_none());
}

// ---- clearing ----

#[test]
fn test_clear_removes_every_record() {
    let store = SessionStore::new(false);
    let session = sample_session(Utc::now() + Duration::hours(1));

    let jar = store.save(CookieJar::new(), &session);
    // Legacy record from an older deployment sits alongside the known names
    let jar = jar.add(axum_extra::extract::cookie::Cookie::new(
        "legacy_session",
        "stale",
    ));

    let cleared = store.clear(jar);

    // Every cookie, known or not, is turned into an expired removal record
    for name in store::session_record_names() {
        let cookie = cleared.get(name).expect("removal record present");
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
    let legacy = cleared.get("legacy_session").expect("legacy removal present");
    assert_eq!(legacy.value(), "");

    assert!(store.load(&cleared).is_none());
}

// ---- refresh gate ----

#[test]
fn test_gate_single_acquire() {
    let gate = std::sync::Arc::new(RefreshGate::new());
    assert!(!gate.is_held());

    let permit = gate.try_acquire().expect("free gate should acquire");
    assert!(gate.is_held());

    // Second acquire while held is refused
    assert!(gate.try_acquire().is_none());

    drop(permit);
    assert!(!gate.is_held());
    assert!(gate.try_acquire().is_some());
}

#[test]
fn test_gate_releases_on_early_return() {
    let gate = std::sync::Arc::new(RefreshGate::new());

    fn refresh_attempt(gate: &std::sync::Arc<RefreshGate>) -> Option<()> {
        let _permit = gate.try_acquire()?;
        // Provider failure path bails before any explicit release
        None
    }

    assert!(refresh_attempt(&gate).is_none());
    assert!(!gate.is_held(), "permit must release on the failure path");
}

#[test]
fn test_gate_exclusive_across_threads() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    let gate = Arc::new(RefreshGate::new());
    let acquired = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(8));
    let attempted = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let gate = Arc::clone(&gate);
            let acquired = Arc::clone(&acquired);
            let start = Arc::clone(&start);
            let attempted = Arc::clone(&attempted);
            std::thread::spawn(move || {
                start.wait();
                let permit = gate.try_acquire();
                if permit.is_some() {
                    acquired.fetch_add(1, Ordering::SeqCst);
                }
                // Hold until every thread has attempted, then release
                attempted.wait();
                drop(permit);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(acquired.load(Ordering::SeqCst), 1);
    assert!(!gate.is_held());
}
