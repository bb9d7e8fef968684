//! # Initgate Core
//!
//! Synchronous verification stages for mini-app init data. Every stage is a
//! pure function; nothing here touches storage or the network.
//!
//! ## Pipeline
//!
//! 1. **Parse**: decode one level of form-urlencoding into a [`FieldMap`]
//! 2. **Canonicalize**: drop `hash`/`signature`, sort, join into a [`CheckString`]
//! 3. **Verify signature**: `HMAC-SHA256(HMAC-SHA256("WebAppData", token), check)`
//! 4. **Check freshness**: `auth_date` against a [`FreshnessPolicy`]
//! 5. **Extract claims**: build the [`Principal`]
//!
//! Replay suppression needs a shared store and lives in the server crate;
//! [`validate`] returns the [`ReplayDigest`] it should admit.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod fields;
pub mod freshness;
pub mod principal;
pub mod signature;

pub use canonical::{serialize, CanonicalFields, CheckString};
pub use digest::ReplayDigest;
pub use error::{Rejection, Result, SecretError, Stage};
pub use fields::{parse, FieldMap};
pub use freshness::{check_freshness, parse_auth_date, FreshnessPolicy};
pub use principal::{Principal, UserProfile};
pub use signature::VerificationSecret;

use tracing::debug;

/// Output of the stateless stages, ready for replay admission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInitData {
    pub principal: Principal,
    pub digest: ReplayDigest,
}

/// Run parse, canonicalize, signature and freshness checks on a raw blob
///
/// `now` is epoch seconds. Stages run strictly in order and the first
/// failure is returned.
pub fn validate(
    raw: &str,
    secret: &VerificationSecret,
    policy: &FreshnessPolicy,
    now: i64,
) -> Result<ValidatedInitData> {
    let digest = ReplayDigest::of(raw);

    let fields = parse(raw)?;
    debug!(digest = %digest, field_count = fields.len(), stage = %Stage::Parsed, "Init data parsed");

    let supplied = fields.hash().ok_or(Rejection::MissingHash)?;
    let check = serialize(&fields);
    secret.verify(&check, supplied)?;
    debug!(digest = %digest, stage = %Stage::SignatureValid, "Init data signature valid");

    let auth_date_raw = fields
        .get(fields::AUTH_DATE_FIELD)
        .ok_or_else(|| Rejection::MalformedInput("no auth_date field".into()))?;
    let auth_date = check_freshness(auth_date_raw, now, policy)?;
    debug!(digest = %digest, auth_date, stage = %Stage::Fresh, "Init data fresh");

    let principal = Principal::from_fields(&fields, auth_date)?;

    Ok(ValidatedInitData { principal, digest })
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
