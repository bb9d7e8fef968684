//! Init-data verifier
//!
//! The single entry point request handlers use. Runs the stages in order:
//!
//! `Unverified → Parsed → SignatureValid → Fresh → Admitted`
//!
//! Any stage may reject; nothing is retried. Claims are extracted before the
//! replay admit, so a blob that cannot produce a principal is never consumed,
//! and the admit is the last step, so a verification dropped before it
//! completes leaves nothing behind.

use chrono::{DateTime, Utc};
use initgate_core::{FreshnessPolicy, Principal, Rejection, ReplayDigest, VerificationSecret};
use tracing::{info, warn};

use super::replay::ReplayGuard;

/// Verifies init data and admits each blob once
#[derive(Debug, Clone)]
pub struct Verifier {
    secret: VerificationSecret,
    freshness: FreshnessPolicy,
    guard: ReplayGuard,
}

impl Verifier {
    /// Create a verifier
    ///
    /// The secret is injected here rather than read from process state, so
    /// each instance can carry its own.
    pub fn new(secret: VerificationSecret, freshness: FreshnessPolicy, guard: ReplayGuard) -> Self {
        Self {
            secret,
            freshness,
            guard,
        }
    }

    pub fn freshness(&self) -> &FreshnessPolicy {
        &self.freshness
    }

    pub fn guard(&self) -> &ReplayGuard {
        &self.guard
    }

    /// Masked identifier of the verification secret
    pub fn secret_fingerprint(&self) -> String {
        self.secret.fingerprint()
    }

    /// Verify `raw` against the wall clock
    pub async fn verify(&self, raw: &str) -> Result<Principal, Rejection> {
        self.verify_at(raw, Utc::now()).await
    }

    /// Verify `raw` as of `now`
    pub async fn verify_at(&self, raw: &str, now: DateTime<Utc>) -> Result<Principal, Rejection> {
        let validated = match initgate_core::validate(raw, &self.secret, &self.freshness, now.timestamp()) {
            Ok(validated) => validated,
            Err(rejection) => {
                log_rejection(&ReplayDigest::of(raw), &rejection);
                return Err(rejection);
            }
        };

        // The guard logs its own outcomes
        let digest = validated.digest;
        self.guard.admit_once(digest, now).await?;

        info!(
            user_id = validated.principal.user_id,
            auth_date = validated.principal.auth_date,
            digest = %digest,
            "Init data verified"
        );

        Ok(validated.principal)
    }
}

fn log_rejection(digest: &ReplayDigest, rejection: &Rejection) {
    match rejection {
        Rejection::SignatureMismatch | Rejection::CryptoError(_) => warn!(
            digest = %digest,
            code = rejection.code(),
            stage = %rejection.stage(),
            "SECURITY: Init data signature rejected"
        ),
        _ => warn!(
            digest = %digest,
            code = rejection.code(),
            stage = %rejection.stage(),
            reason = %rejection,
            "Init data rejected"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::replay::{ReplayPolicy, DEFAULT_STORE_TIMEOUT};
    use crate::storage::MemoryStore;
    use initgate_core::{serialize, FieldMap};
    use std::sync::Arc;

    const TOKEN: &str = "7000000001:AAH-fake-token-for-known-answer-tests";

    fn verifier() -> Verifier {
        let store = Arc::new(MemoryStore::new());
        let guard = ReplayGuard::new(store, ReplayPolicy::new(331, DEFAULT_STORE_TIMEOUT));
        Verifier::new(
            VerificationSecret::from_bot_token(TOKEN).unwrap(),
            FreshnessPolicy::default(),
            guard,
        )
    }

    /// Build a correctly signed blob; only `%`, `&`, `=`, `+` and `"` need escaping here
    fn signed_blob(auth_date: i64, user: &str) -> String {
        let secret = VerificationSecret::from_bot_token(TOKEN).unwrap();
        let mut fields = FieldMap::new();
        fields.insert("auth_date", auth_date.to_string()).unwrap();
        fields.insert("user", user).unwrap();
        let hash = secret.sign(&serialize(&fields)).unwrap();

        let user_encoded = user.replace('"', "%22");
        format!("auth_date={}&user={}&hash={}", auth_date, user_encoded, hash)
    }

    #[tokio::test]
    async fn test_accept_then_replay() {
        let verifier = verifier();
        let now = Utc::now();
        let raw = signed_blob(now.timestamp(), r#"{"id":42}"#);

        let principal = verifier.verify_at(&raw, now).await.unwrap();
        assert_eq!(principal.user_id, 42);

        assert_eq!(
            verifier.verify_at(&raw, now).await,
            Err(Rejection::AlreadyProcessed)
        );
    }

    #[tokio::test]
    async fn test_rejected_blob_is_not_consumed() {
        let verifier = verifier();
        let now = Utc::now();
        let raw = signed_blob(now.timestamp() - 400, r#"{"id":42}"#);

        assert!(matches!(
            verifier.verify_at(&raw, now).await,
            Err(Rejection::Stale { .. })
        ));

        // Nothing was recorded, so pruning finds nothing
        assert_eq!(verifier.guard().prune(now + chrono::Duration::days(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_user_is_not_consumed() {
        let verifier = verifier();
        let now = Utc::now();
        let raw = signed_blob(now.timestamp(), r#"{"name":"no id"}"#);

        assert!(matches!(
            verifier.verify_at(&raw, now).await,
            Err(Rejection::MalformedInput(_))
        ));
        assert_eq!(verifier.guard().prune(now + chrono::Duration::days(1)).await.unwrap(), 0);
    }

    #[test]
    fn test_debug_hides_secret() {
        let rendered = format!("{:?}", verifier());
        assert!(rendered.contains("fingerprint"));
        assert!(!rendered.contains("311f00b4"));
    }
}
