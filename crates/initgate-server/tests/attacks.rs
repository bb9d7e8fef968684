//! Attack Scenario Tests
//!
//! Each test replays a concrete way a client could try to get forged, reused
//! or stretched init data past the gate, and checks that it is blocked.

use chrono::{Duration, TimeZone, Utc};
use initgate_core::{serialize, FieldMap, FreshnessPolicy, Rejection, VerificationSecret};
use initgate_server::{GateConfig, MemoryStore, ReplayGuard, Verifier};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::sync::Arc;

const TOKEN: &str = "7000000001:AAH-fake-token-for-known-answer-tests";
const OTHER_TOKEN: &str = "7000000002:AAH-some-other-bot-entirely";

const NOW: i64 = 1_700_000_000;
const USER: &str = r#"{"id":42,"first_name":"Ada"}"#;

// =============================================================================
// Test Helpers
// =============================================================================

/// Verifier wired the way the binary wires it, from configuration defaults
fn verifier() -> Verifier {
    let config = GateConfig::from_lookup(|name| match name {
        "BOT_TOKEN" => Some(TOKEN.to_string()),
        "REPLAY_STORE_URL" => Some("memory://".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(config.freshness, FreshnessPolicy::default());

    let guard = ReplayGuard::new(Arc::new(MemoryStore::new()), config.replay);
    Verifier::new(config.secret, config.freshness, guard)
}

fn at(secs: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn at_millis(millis: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

fn sign_with(token: &str, fields: &[(&str, &str)]) -> String {
    let secret = VerificationSecret::from_bot_token(token).unwrap();
    let mut map = FieldMap::new();
    for (k, v) in fields {
        map.insert(*k, *v).unwrap();
    }
    secret.sign(&serialize(&map)).unwrap()
}

fn blob(auth_date: i64, extra: &[(&str, &str)]) -> String {
    let auth_date = auth_date.to_string();
    let mut fields = vec![("auth_date", auth_date.as_str()), ("user", USER)];
    fields.extend_from_slice(extra);
    let hash = sign_with(TOKEN, &fields);

    let mut parts: Vec<String> = fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, encode(v)))
        .collect();
    parts.push(format!("hash={}", hash));
    parts.join("&")
}

// =============================================================================
// ATTACK: Replay
// =============================================================================

/// A captured blob is resubmitted inside the freshness window.
#[tokio::test]
async fn attack_replay_within_window_blocked() {
    let verifier = verifier();
    let raw = blob(NOW, &[]);

    assert!(verifier.verify_at(&raw, at(NOW + 1)).await.is_ok());
    assert_eq!(
        verifier.verify_at(&raw, at(NOW + 200)).await,
        Err(Rejection::AlreadyProcessed)
    );
}

/// The replay record is pruned, but by then the blob is stale anyway.
#[tokio::test]
async fn attack_replay_after_pruning_blocked_by_freshness() {
    let verifier = verifier();
    let raw = blob(NOW + 30, &[]);

    // Accepted at the earliest moment: 30 seconds before its auth_date
    assert!(verifier.verify_at(&raw, at(NOW)).await.is_ok());

    let later = at(NOW) + Duration::seconds(331);
    assert_eq!(verifier.guard().prune(later).await.unwrap(), 1);

    assert!(matches!(
        verifier.verify_at(&raw, later).await,
        Err(Rejection::Stale { .. })
    ));
}

/// Pruning at the exact second the record expires must not reopen the blob.
#[tokio::test]
async fn attack_replay_at_retention_boundary_blocked() {
    let verifier = verifier();
    let raw = blob(NOW + 30, &[]);

    assert!(verifier.verify_at(&raw, at(NOW)).await.is_ok());

    // Last second in which the blob is still fresh
    let boundary = at(NOW + 330);
    assert_eq!(verifier.guard().prune(boundary).await.unwrap(), 0);
    assert_eq!(
        verifier.verify_at(&raw, boundary).await,
        Err(Rejection::AlreadyProcessed)
    );
}

/// Sweep admission times, issuance offsets and prune instants around the
/// record's expiry; a second verification is never accepted.
#[tokio::test]
async fn attack_replay_never_reopens_around_expiry() {
    let retention_ms = i64::try_from(FreshnessPolicy::default().min_replay_retention_secs())
        .unwrap()
        * 1000;

    for auth_offset in [30, 0, -150, -300] {
        for admit_ms in [0, 1, 500, 999] {
            for delta_ms in [-1000, -1, 0, 1, 1000] {
                let verifier = verifier();
                let raw = blob(NOW + auth_offset, &[]);
                let admitted_at = NOW * 1000 + admit_ms;

                assert!(
                    verifier.verify_at(&raw, at_millis(admitted_at)).await.is_ok(),
                    "first verification failed: auth_offset={auth_offset} admit_ms={admit_ms}"
                );

                let instant = at_millis(admitted_at + retention_ms + delta_ms);
                verifier.guard().prune(instant).await.unwrap();

                let second = verifier.verify_at(&raw, instant).await;
                assert!(
                    second.is_err(),
                    "blob admitted twice: auth_offset={auth_offset} admit_ms={admit_ms} delta_ms={delta_ms}"
                );
            }
        }
    }
}

/// Tampered submissions must not burn the legitimate blob.
#[tokio::test]
async fn attack_rejected_variant_does_not_consume_original() {
    let verifier = verifier();
    let raw = blob(NOW, &[]);
    let tampered = raw.replace("Ada", "Eve");

    assert_eq!(
        verifier.verify_at(&tampered, at(NOW)).await,
        Err(Rejection::SignatureMismatch)
    );
    assert!(verifier.verify_at(&raw, at(NOW)).await.is_ok());
}

// =============================================================================
// ATTACK: Lifetime Extension
// =============================================================================

/// Bumping auth_date to look fresh breaks the signature.
#[tokio::test]
async fn attack_auth_date_rewrite_blocked() {
    let verifier = verifier();
    let raw = blob(NOW - 3600, &[]);
    let rewritten = raw.replacen(
        &format!("auth_date={}", NOW - 3600),
        &format!("auth_date={}", NOW),
        1,
    );

    assert_eq!(
        verifier.verify_at(&rewritten, at(NOW)).await,
        Err(Rejection::SignatureMismatch)
    );
}

/// A second auth_date appended to a stale blob is not silently preferred.
#[tokio::test]
async fn attack_duplicate_field_smuggling_blocked() {
    let verifier = verifier();
    let raw = format!("{}&auth_date={}", blob(NOW - 3600, &[]), NOW);

    assert!(matches!(
        verifier.verify_at(&raw, at(NOW)).await,
        Err(Rejection::MalformedInput(_))
    ));
}

/// A blob minted ahead of time for later use.
#[tokio::test]
async fn attack_future_dated_blob_blocked() {
    let verifier = verifier();

    assert_eq!(
        verifier.verify_at(&blob(NOW + 31, &[]), at(NOW)).await,
        Err(Rejection::NotYetValid { lead_secs: 31, tolerance_secs: 30 })
    );
    assert!(verifier.verify_at(&blob(NOW + 30, &[]), at(NOW)).await.is_ok());
}

// =============================================================================
// ATTACK: Forgery
// =============================================================================

/// A blob signed for a different bot.
#[tokio::test]
async fn attack_cross_bot_blob_blocked() {
    let verifier = verifier();
    let auth_date = NOW.to_string();
    let hash = sign_with(OTHER_TOKEN, &[("auth_date", auth_date.as_str()), ("user", USER)]);
    let raw = format!("auth_date={}&user={}&hash={}", auth_date, encode(USER), hash);

    assert_eq!(
        verifier.verify_at(&raw, at(NOW)).await,
        Err(Rejection::SignatureMismatch)
    );
}

/// Encoding a signed value twice must not decode back to the signed value.
#[tokio::test]
async fn attack_double_encoding_blocked() {
    let verifier = verifier();
    let auth_date = NOW.to_string();
    let hash = sign_with(TOKEN, &[("auth_date", auth_date.as_str()), ("user", USER)]);
    let raw = format!(
        "auth_date={}&user={}&hash={}",
        auth_date,
        encode(&encode(USER)),
        hash
    );

    assert_eq!(
        verifier.verify_at(&raw, at(NOW)).await,
        Err(Rejection::SignatureMismatch)
    );
}

/// Separators smuggled inside an encoded value stay inside that value.
#[tokio::test]
async fn attack_encoded_separator_injection_contained() {
    let verifier = verifier();
    let injected = format!("promo&auth_date={}&user={{\"id\":1}}", NOW + 9999);
    let raw = blob(NOW, &[("start_param", injected.as_str())]);

    let principal = verifier.verify_at(&raw, at(NOW)).await.unwrap();
    assert_eq!(principal.user_id, 42);
    assert_eq!(principal.auth_date, NOW);
    assert_eq!(principal.start_param.as_deref(), Some(injected.as_str()));
}

/// Stripping the hash does not downgrade to an unsigned mode.
#[tokio::test]
async fn attack_hash_stripping_blocked() {
    let verifier = verifier();
    let raw = format!("auth_date={}&user={}", NOW, encode(USER));

    assert_eq!(
        verifier.verify_at(&raw, at(NOW)).await,
        Err(Rejection::MissingHash)
    );

    let empty_hash = format!("{}&hash=", raw);
    assert_eq!(
        verifier.verify_at(&empty_hash, at(NOW)).await,
        Err(Rejection::MissingHash)
    );
}
